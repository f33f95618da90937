pub mod course;
pub mod roadmap;
pub mod student;

pub use course::{CourseRecord, CourseSelection};
pub use roadmap::{Roadmap, RoadmapCourse, RoadmapLevel, RoadmapLevels};
pub use student::{SkillLevel, SkillRecord, StudentProfile};
