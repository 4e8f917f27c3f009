// # File Topology Store
//
// File-backed implementation of TopologyStore.
//
// ## Purpose
//
// Persists the declared topology as a JSON snapshot so repeated
// provisioning runs see what earlier runs declared. Mutations accumulate
// in memory and become durable on `commit()`, matching the store
// contract: commit is the one unit of persistence.
//
// ## Atomicity
//
// Commit writes the snapshot to a temporary file and renames it over the
// previous one. A crash mid-commit leaves the previous snapshot intact.
//
// ## File Format
//
// ```json
// {
//   "version": "1.0",
//   "topology": {
//     "cloud": { "root_domain": "pom.ac", ... },
//     "shapes": { "all": { ... } },
//     "hosts": { "node1": { ... } }
//   }
// }
// ```

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::RwLock;

use super::{TopologyState, generate_key_material};
use crate::Error;
use crate::traits::TopologyStore;

/// Snapshot format version, for future migration
const SNAPSHOT_VERSION: &str = "1.0";

/// Serializable snapshot format
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct SnapshotFormat {
    version: String,
    topology: TopologyState,
}

/// Internal state for the file-backed store
#[derive(Debug)]
struct FileState {
    topology: TopologyState,
    dirty: bool,
}

/// File-backed topology store
#[derive(Debug)]
pub struct FileTopology {
    path: PathBuf,
    state: Arc<RwLock<FileState>>,
}

impl FileTopology {
    /// Create or load a file topology store
    ///
    /// Loads the snapshot at `path` if one exists; starts empty
    /// otherwise. A snapshot that exists but fails to parse is an error:
    /// silently starting empty would re-declare every host on the next
    /// converge and erase the previous declarations at commit.
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).await.map_err(|e| {
                Error::topology(format!(
                    "failed to create topology directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let topology = match fs::read(&path).await {
            Ok(bytes) => {
                let snapshot: SnapshotFormat = serde_json::from_slice(&bytes).map_err(|e| {
                    Error::topology(format!(
                        "topology snapshot {} is corrupt: {}",
                        path.display(),
                        e
                    ))
                })?;
                snapshot.topology
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => TopologyState::default(),
            Err(e) => {
                return Err(Error::topology(format!(
                    "failed to read topology snapshot {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        Ok(Self {
            path,
            state: Arc::new(RwLock::new(FileState {
                topology,
                dirty: false,
            })),
        })
    }

    /// Apply one mutation and mark the state dirty
    async fn mutate<F>(&self, f: F) -> Result<(), Error>
    where
        F: FnOnce(&mut TopologyState),
    {
        let mut guard = self.state.write().await;
        f(&mut guard.topology);
        guard.dirty = true;
        Ok(())
    }
}

#[async_trait]
impl TopologyStore for FileTopology {
    async fn set_root_domain(&self, domain: &str) -> Result<(), Error> {
        let domain = domain.to_string();
        self.mutate(|t| t.cloud.root_domain = Some(domain)).await
    }

    async fn set_generated_domain(&self, domain: &str) -> Result<(), Error> {
        let domain = domain.to_string();
        self.mutate(|t| t.cloud.generated_domain = Some(domain)).await
    }

    async fn domain_validation_key(&self) -> Result<Option<String>, Error> {
        Ok(self.state.read().await.topology.cloud.validation_key.clone())
    }

    async fn generate_domain_validation(&self) -> Result<(), Error> {
        self.mutate(|t| t.cloud.validation_key = Some(generate_key_material()))
            .await
    }

    async fn swarm_key(&self) -> Result<Option<String>, Error> {
        Ok(self.state.read().await.topology.cloud.swarm_key.clone())
    }

    async fn generate_swarm_key(&self) -> Result<(), Error> {
        self.mutate(|t| t.cloud.swarm_key = Some(generate_key_material()))
            .await
    }

    async fn set_signer(&self, name: &str, username: &str, password: &str) -> Result<(), Error> {
        let (name, username, password) =
            (name.to_string(), username.to_string(), password.to_string());
        self.mutate(|t| {
            let signer = t.signers.entry(name).or_default();
            signer.username = username;
            signer.password = password;
        })
        .await
    }

    async fn set_shape_services(&self, shape: &str, services: &[String]) -> Result<(), Error> {
        let services = services.to_vec();
        self.mutate(|t| t.shape_mut(shape).services = services).await
    }

    async fn set_shape_port(&self, shape: &str, port: &str, value: u16) -> Result<(), Error> {
        let port = port.to_string();
        self.mutate(|t| {
            t.shape_mut(shape).ports.insert(port, value);
        })
        .await
    }

    async fn add_bootstrap_nodes(&self, shape: &str, nodes: &[String]) -> Result<(), Error> {
        let nodes = nodes.to_vec();
        self.mutate(|t| t.shape_mut(shape).bootstrap.extend(nodes)).await
    }

    async fn list_hosts(&self) -> Result<Vec<String>, Error> {
        Ok(self.state.read().await.topology.hosts.keys().cloned().collect())
    }

    async fn add_host_address(&self, host: &str, cidr: &str) -> Result<(), Error> {
        let cidr = cidr.to_string();
        self.mutate(|t| t.host_mut(host).addresses.push(cidr)).await
    }

    async fn host_addresses(&self, host: &str) -> Result<Vec<String>, Error> {
        Ok(self
            .state
            .read()
            .await
            .topology
            .hosts
            .get(host)
            .map(|h| h.addresses.clone())
            .unwrap_or_default())
    }

    async fn set_ssh_address(&self, host: &str, address: &str) -> Result<(), Error> {
        let address = address.to_string();
        self.mutate(|t| t.host_mut(host).ssh_address = Some(address)).await
    }

    async fn add_ssh_auth(&self, host: &str, signers: &[String]) -> Result<(), Error> {
        let signers = signers.to_vec();
        self.mutate(|t| t.host_mut(host).ssh_auth.extend(signers)).await
    }

    async fn set_location(&self, host: &str, location: &str) -> Result<(), Error> {
        let location = location.to_string();
        self.mutate(|t| t.host_mut(host).location = Some(location)).await
    }

    async fn host_shapes(&self, host: &str) -> Result<Vec<String>, Error> {
        Ok(self
            .state
            .read()
            .await
            .topology
            .hosts
            .get(host)
            .map(|h| h.shapes.clone())
            .unwrap_or_default())
    }

    async fn generate_shape_instance(&self, host: &str, shape: &str) -> Result<(), Error> {
        self.mutate(|t| {
            let shapes = &mut t.host_mut(host).shapes;
            if !shapes.contains(&shape.to_string()) {
                shapes.push(shape.to_string());
            }
        })
        .await
    }

    async fn commit(&self) -> Result<(), Error> {
        let mut guard = self.state.write().await;
        if !guard.dirty {
            tracing::debug!("topology snapshot unchanged; skipping write");
            return Ok(());
        }

        let snapshot = SnapshotFormat {
            version: SNAPSHOT_VERSION.to_string(),
            topology: guard.topology.clone(),
        };
        let json = serde_json::to_vec_pretty(&snapshot)?;

        // Write-then-rename so a crash mid-commit keeps the old snapshot.
        let tmp_path = self.path.with_extension("tmp");
        fs::write(&tmp_path, &json).await.map_err(|e| {
            Error::topology(format!(
                "failed to write topology snapshot {}: {}",
                tmp_path.display(),
                e
            ))
        })?;
        fs::rename(&tmp_path, &self.path).await.map_err(|e| {
            Error::topology(format!(
                "failed to move topology snapshot into place at {}: {}",
                self.path.display(),
                e
            ))
        })?;

        guard.dirty = false;
        tracing::debug!("topology snapshot committed to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn commit_persists_across_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("topology.json");

        {
            let store = FileTopology::new(&path).await.unwrap();
            store.add_host_address("node1", "203.0.113.7/32").await.unwrap();
            store.generate_swarm_key().await.unwrap();
            store.commit().await.unwrap();
        }

        let reloaded = FileTopology::new(&path).await.unwrap();
        assert_eq!(reloaded.list_hosts().await.unwrap(), vec!["node1"]);
        assert!(reloaded.swarm_key().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn uncommitted_mutations_do_not_persist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("topology.json");

        {
            let store = FileTopology::new(&path).await.unwrap();
            store.add_host_address("node1", "203.0.113.7/32").await.unwrap();
            // dropped without commit
        }

        let reloaded = FileTopology::new(&path).await.unwrap();
        assert!(reloaded.list_hosts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn corrupt_snapshot_is_an_error_not_a_reset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("topology.json");
        tokio::fs::write(&path, b"{ not json").await.unwrap();

        let err = FileTopology::new(&path).await.unwrap_err();
        assert!(matches!(err, Error::Topology(_)));
    }

    #[tokio::test]
    async fn clean_commit_skips_rewrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("topology.json");

        let store = FileTopology::new(&path).await.unwrap();
        store.commit().await.unwrap();
        // nothing was declared, so no snapshot should exist
        assert!(!path.exists());
    }
}
