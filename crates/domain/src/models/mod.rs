pub mod page;
pub mod request;
pub mod task;

pub use page::{cursor_param, ListPayload, TaskPage};
pub use request::{NewTaskRequest, ProperMotionInput};
pub use task::{RequestType, Task, TaskState};
