//! Scriptpack source loading
//!
//! Every read from real storage performed by Scriptpack goes through a
//! [`SourceLoader`]. Once text has been loaded it lives in the compiler's
//! in-memory file store and is never read from storage again.
//!
//! # Usage
//! ```rust,ignore
//! use scriptpack_vfs::{MemoryLoader, SourceLoader};
//! use std::path::Path;
//!
//! let loader = MemoryLoader::with_files([("/app/index.ts", "export default 1;")]);
//! let text = loader.read_to_string(Path::new("/app/index.ts")).await?;
//! ```

mod error;
mod loader;
mod memory;
mod native;

pub use error::{LoadError, LoadResult};
pub use loader::{DirEntry, SourceLoader};
pub use memory::MemoryLoader;
pub use native::NativeLoader;

/// Create a loader backed by the native file system.
pub fn native_loader() -> NativeLoader {
    NativeLoader::new()
}
