//! Content store implementations

mod disk;

pub use disk::DiskContentStore;
