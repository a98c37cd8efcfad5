pub mod backup;
pub mod core;
pub mod courses;
pub mod grades;
pub mod students;
