pub mod classes;
pub mod core;
pub mod grades;
pub mod logs;
pub mod parents;
pub mod snapshot;
pub mod students;
pub mod teachers;
pub mod users;
