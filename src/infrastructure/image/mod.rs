//! Image infrastructure: host file collection and archive output

mod archive;
mod rootfs;

pub use archive::{archive_file_name, OciArchiveWriter};
pub use rootfs::{collect_tree, is_executable, HostEntry, HostEntryKind};
