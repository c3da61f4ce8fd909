// Eviction policy — age- and activity-based garbage collection of demo
// images and their leftover containers.

pub mod cleaner;

pub use cleaner::ImageCleaner;
