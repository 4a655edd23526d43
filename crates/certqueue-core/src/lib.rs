//! # certqueue core
//!
//! Interfaces the import subsystem consumes from its host platform:
//!
//! - [`Storage`]: list/get/put/delete over a flat key space with `/` folders
//! - [`Role`]: per-role settings read from `role/<name>`
//! - [`ReplicationSource`] and [`LeadershipGate`]: whether this node may import
//!
//! Two reference stores ([`MemoryStorage`], [`FileStorage`]) and two status
//! sources ([`StaticReplicationSource`], [`FileReplicationSource`]) make the
//! workspace usable outside a host.

pub mod error;
pub mod leadership;
pub mod role;
pub mod storage;

pub use error::{CoreError, CoreResult};
pub use leadership::{
    FileReplicationSource, LeadershipGate, ReplicationSource, ReplicationStatus,
    StaticReplicationSource,
};
pub use role::{Role, ROLE_PREFIX, delete_role, get_role, list_roles, put_role};
pub use storage::{FileStorage, MemoryStorage, Storage, StorageEntry};
