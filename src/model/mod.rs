pub use self::broadcast::*;
pub use self::faculty::*;
pub use self::panel::*;
pub use self::project::*;
pub use self::request::*;
pub use self::rubric::*;
pub use self::scope::*;
pub use self::student::*;

mod broadcast;
mod faculty;
mod panel;
mod project;
mod request;
mod rubric;
mod scope;
mod student;
