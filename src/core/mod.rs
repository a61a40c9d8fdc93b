/// Core functionality modules
///
/// Working out which project and repository the user is in.

pub mod project_detector;

pub use project_detector::ProjectDetector;
