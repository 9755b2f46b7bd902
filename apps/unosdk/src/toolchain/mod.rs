//! Toolchain acquisition: what can be installed, from where, and how it is
//! fetched and unpacked.
//!
//! ## Module Structure
//!
//! - [`kind`] - Toolchain families
//! - [`platform`] - OS and architecture detection
//! - [`paths`] - On-disk layout under the unosdk root
//! - [`provider`] - Provider contract and registry
//! - [`catalog`] - Built-in providers
//! - [`download`] - HTTP download with retries and progress
//! - [`verify`] - SHA-256 checksums
//! - [`archive`] - ZIP and tar.gz extraction

pub mod archive;
pub mod catalog;
pub mod download;
pub mod kind;
pub mod paths;
pub mod platform;
pub mod provider;
pub mod verify;

pub use archive::{ArchiveExtractor, Extractor};
pub use download::{Downloader, HttpDownloader};
pub use paths::UnosdkPaths;
pub use provider::ProviderRegistry;
