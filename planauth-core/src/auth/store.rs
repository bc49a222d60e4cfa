//! Durable storage for the process-wide signing key pair
//!
//! The key directory holds two base64 text files: the private key
//! (seed||public, owner-only) and the public key (world-readable).
//! The first caller generates the pair; every later caller, in this
//! process or another one sharing the directory, loads the same pair.

use crate::{AuthConfig, AuthError, KeyPair, PublicKey, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// Provider of the signing key pair used by the token codec
pub trait KeySource: Send + Sync {
    fn key_pair(&self) -> Result<Arc<KeyPair>>;
}

/// File-backed key store with a lazily initialised in-memory copy
#[derive(Debug)]
pub struct FileKeyStore {
    dir: PathBuf,
    loaded: Mutex<Option<Arc<KeyPair>>>,
}

impl FileKeyStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        FileKeyStore {
            dir: dir.as_ref().to_path_buf(),
            loaded: Mutex::new(None),
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(&config.key_path)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn private_key_path(&self) -> PathBuf {
        self.dir.join(crate::PRIVATE_KEY_FILE)
    }

    pub fn public_key_path(&self) -> PathBuf {
        self.dir.join(crate::PUBLIC_KEY_FILE)
    }

    /// Get the process-wide key pair, loading or generating it on first use.
    ///
    /// The check-generate-write sequence runs under the store's lock, so
    /// concurrent first callers observe a single generation.
    pub fn get_keys(&self) -> Result<Arc<KeyPair>> {
        let mut loaded = self
            .loaded
            .lock()
            .map_err(|_| AuthError::KeyUnavailable("key store lock poisoned".to_string()))?;

        if let Some(keypair) = loaded.as_ref() {
            return Ok(Arc::clone(keypair));
        }

        let keypair = Arc::new(self.load_or_generate()?);
        *loaded = Some(Arc::clone(&keypair));
        Ok(keypair)
    }

    /// Resolve the key pair from storage without consulting the cached copy
    pub fn load_or_generate(&self) -> Result<KeyPair> {
        self.ensure_dir()?;

        let private_path = self.private_key_path();
        match fs::metadata(&private_path) {
            Ok(_) => self.load_from_files(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => self.generate_and_save(),
            Err(e) => Err(unavailable("error checking key file", &private_path, e)),
        }
    }

    fn ensure_dir(&self) -> Result<()> {
        create_private_dir(&self.dir)
            .map_err(|e| unavailable("failed to create key directory", &self.dir, e))
    }

    fn generate_and_save(&self) -> Result<KeyPair> {
        let keypair = KeyPair::generate();
        let private_path = self.private_key_path();

        let mut staged = NamedTempFile::new_in(&self.dir)
            .map_err(|e| unavailable("failed to stage private key", &self.dir, e))?;
        write_encoded(&mut staged, &keypair.keypair_bytes())
            .map_err(|e| unavailable("failed to write private key", staged.path(), e))?;

        // The private key file is created atomically and never overwritten;
        // losing the race means another writer's key is the one in force.
        if let Err(e) = staged.persist_noclobber(&private_path) {
            if e.error.kind() == io::ErrorKind::AlreadyExists {
                debug!("Private key appeared concurrently, loading it instead");
                return self.load_from_files();
            }
            return Err(unavailable("failed to save private key", &private_path, e.error));
        }

        self.write_public_key(&keypair.public_key())?;

        info!(
            "Generated new Ed25519 key pair {} in {}",
            keypair.key_id(),
            self.dir.display()
        );
        Ok(keypair)
    }

    fn load_from_files(&self) -> Result<KeyPair> {
        let private_path = self.private_key_path();
        let encoded = fs::read_to_string(&private_path)
            .map_err(|e| unavailable("failed to read private key file", &private_path, e))?;
        let decoded = STANDARD.decode(encoded.trim()).map_err(|e| {
            AuthError::KeyUnavailable(format!(
                "failed to decode private key {}: {}",
                private_path.display(),
                e
            ))
        })?;
        let keypair = KeyPair::from_private_bytes(&decoded)?;

        match self.read_public_key() {
            Ok(public_key) if public_key == keypair.public_key() => {}
            Ok(_) => {
                warn!("Public key file does not match the private key, deriving it");
                self.repair_public_key(&keypair);
            }
            Err(reason) => {
                warn!("Public key file unusable ({}), deriving it", reason);
                self.repair_public_key(&keypair);
            }
        }

        debug!("Loaded Ed25519 key pair {}", keypair.key_id());
        Ok(keypair)
    }

    fn read_public_key(&self) -> std::result::Result<PublicKey, String> {
        let path = self.public_key_path();
        let encoded = fs::read_to_string(&path).map_err(|e| e.to_string())?;
        let decoded = STANDARD.decode(encoded.trim()).map_err(|e| e.to_string())?;
        PublicKey::from_slice(&decoded).map_err(|e| e.to_string())
    }

    fn repair_public_key(&self, keypair: &KeyPair) {
        if let Err(e) = self.write_public_key(&keypair.public_key()) {
            warn!("Could not rewrite public key file: {}", e);
        }
    }

    fn write_public_key(&self, public_key: &PublicKey) -> Result<()> {
        let public_path = self.public_key_path();

        let mut staged = NamedTempFile::new_in(&self.dir)
            .map_err(|e| unavailable("failed to stage public key", &self.dir, e))?;
        write_encoded(&mut staged, &public_key.to_bytes())
            .map_err(|e| unavailable("failed to write public key", staged.path(), e))?;
        set_world_readable(staged.path())
            .map_err(|e| unavailable("failed to set public key permissions", staged.path(), e))?;
        staged
            .persist(&public_path)
            .map_err(|e| unavailable("failed to save public key", &public_path, e.error))?;

        Ok(())
    }
}

impl KeySource for FileKeyStore {
    fn key_pair(&self) -> Result<Arc<KeyPair>> {
        self.get_keys()
    }
}

/// In-memory key source holding a fixed key pair
#[derive(Debug, Clone)]
pub struct StaticKeySource {
    keypair: Arc<KeyPair>,
}

impl StaticKeySource {
    pub fn new(keypair: KeyPair) -> Self {
        StaticKeySource {
            keypair: Arc::new(keypair),
        }
    }

    pub fn generate() -> Self {
        Self::new(KeyPair::generate())
    }
}

impl KeySource for StaticKeySource {
    fn key_pair(&self) -> Result<Arc<KeyPair>> {
        Ok(Arc::clone(&self.keypair))
    }
}

fn unavailable(context: &str, path: &Path, err: io::Error) -> AuthError {
    AuthError::KeyUnavailable(format!("{} {}: {}", context, path.display(), err))
}

fn write_encoded(file: &mut NamedTempFile, bytes: &[u8]) -> io::Result<()> {
    file.write_all(STANDARD.encode(bytes).as_bytes())?;
    file.as_file().sync_all()
}

#[cfg(unix)]
fn create_private_dir(dir: &Path) -> io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;

    fs::DirBuilder::new().recursive(true).mode(0o700).create(dir)
}

#[cfg(not(unix))]
fn create_private_dir(dir: &Path) -> io::Result<()> {
    fs::create_dir_all(dir)
}

#[cfg(unix)]
fn set_world_readable(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn set_world_readable(_path: &Path) -> io::Result<()> {
    Ok(())
}
