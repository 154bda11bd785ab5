use std::path::Path;

use x509_parser::pem::Pem;

use crate::certificate::Certificate;
use crate::error::RootStoreError;

type Result<T> = std::result::Result<T, RootStoreError>;

/// Certificates trusted as chain anchors.
///
/// The store is a plain value: build it once and pass it by reference to
/// every verification.
#[derive(Debug, Clone, Default)]
pub struct RootStore {
    roots: Vec<Certificate>,
}

impl RootStore {
    pub fn new(roots: Vec<Certificate>) -> Self {
        let mut store = RootStore::empty();
        for root in roots {
            store.add(root);
        }
        store
    }

    pub fn empty() -> Self {
        RootStore { roots: Vec::new() }
    }

    /// Create a root store from a PEM bundle.
    pub fn from_pem(pem_data: &[u8]) -> Result<Self> {
        let mut store = RootStore::empty();
        store.add_pem_bundle(pem_data)?;
        Ok(store)
    }

    pub fn from_pem_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|e| io_error(path, e))?;
        Self::from_pem(&data)
    }

    /// Load the platform's CA bundle.
    ///
    /// Lookup order:
    /// 1. `SSL_CERT_FILE` environment variable
    /// 2. `/etc/ssl/certs/ca-certificates.crt` (Debian/Ubuntu)
    /// 3. `/etc/pki/tls/certs/ca-bundle.crt` (RHEL/Fedora)
    /// 4. `/etc/ssl/ca-bundle.pem` (openSUSE)
    /// 5. `/etc/ssl/cert.pem` (macOS, Alpine)
    /// 6. `SSL_CERT_DIR`, then the `/etc/ssl/certs` directory
    pub fn system() -> Result<Self> {
        let mut store = RootStore::empty();

        let mut bundle_paths: Vec<Option<String>> = vec![std::env::var("SSL_CERT_FILE").ok()];
        bundle_paths.extend([
            Some("/etc/ssl/certs/ca-certificates.crt".into()),
            Some("/etc/pki/tls/certs/ca-bundle.crt".into()),
            Some("/etc/ssl/ca-bundle.pem".into()),
            Some("/etc/ssl/cert.pem".into()),
        ]);

        for path in bundle_paths.iter().flatten() {
            if let Ok(data) = std::fs::read(path) {
                if let Ok(added) = store.add_pem_bundle(&data) {
                    if added > 0 {
                        log::debug!("loaded {} trusted roots from {}", added, path);
                        return Ok(store);
                    }
                }
            }
        }

        let dir_paths = [
            std::env::var("SSL_CERT_DIR").ok(),
            Some("/etc/ssl/certs".into()),
        ];
        for dir in dir_paths.iter().flatten() {
            if let Ok(added) = store.add_pem_directory(dir) {
                if added > 0 {
                    log::debug!("loaded {} trusted roots from {}", added, dir);
                    return Ok(store);
                }
            }
        }

        Err(RootStoreError::NotFound)
    }

    /// Adds `root` unless an identical certificate is already present.
    pub fn add(&mut self, root: Certificate) {
        if !self.roots.contains(&root) {
            self.roots.push(root);
        }
    }

    /// Add all certificates from a PEM bundle. Returns the number of
    /// certificates read, skipping blocks that fail to parse.
    pub fn add_pem_bundle(&mut self, pem_data: &[u8]) -> Result<usize> {
        let mut added = 0;
        for pem in Pem::iter_from_buffer(pem_data) {
            let pem = match pem {
                Ok(pem) => pem,
                Err(e) => {
                    if added == 0 {
                        return Err(crate::CertificateError::Pem(e.to_string()).into());
                    }
                    break;
                }
            };
            if pem.label != "CERTIFICATE" && pem.label != "TRUSTED CERTIFICATE" {
                continue;
            }
            match Certificate::from_der(&pem.contents) {
                Ok(cert) => {
                    self.add(cert);
                    added += 1;
                }
                Err(e) => log::warn!("skipping trust store entry: {}", e),
            }
        }
        Ok(added)
    }

    /// Adds the certificates of every PEM file in `dir`, not recursing.
    /// Unreadable files are logged and skipped.
    pub fn add_pem_directory(&mut self, dir: impl AsRef<Path>) -> Result<usize> {
        let dir = dir.as_ref();
        let mut total = 0;
        for entry in std::fs::read_dir(dir).map_err(|e| io_error(dir, e))? {
            let path = entry.map_err(|e| io_error(dir, e))?.path();
            if !path.is_file() || !looks_like_certificate_file(&path) {
                continue;
            }
            let added = std::fs::read(&path)
                .map_err(|e| io_error(&path, e))
                .and_then(|data| self.add_pem_bundle(&data));
            match added {
                Ok(added) => total += added,
                Err(e) => log::warn!("skipping {}: {}", path.display(), e),
            }
        }
        Ok(total)
    }

    pub fn trusted_roots(&self) -> &[Certificate] {
        &self.roots
    }

    /// `cert` is one of the trusted roots, or was issued (name and
    /// signature) by one.
    pub fn is_trusted(&self, cert: &Certificate) -> bool {
        self.roots
            .iter()
            .any(|root| root == cert || root.verify_issued(cert))
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

fn io_error(path: &Path, err: std::io::Error) -> RootStoreError {
    RootStoreError::Io(std::io::Error::new(
        err.kind(),
        format!("{}: {}", path.display(), err),
    ))
}

/// PEM-ish extensions, plus the `<hash>.<n>` links `c_rehash` creates.
fn looks_like_certificate_file(path: &Path) -> bool {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) => {
            matches!(ext, "pem" | "crt" | "cer")
                || (!ext.is_empty() && ext.bytes().all(|b| b.is_ascii_digit()))
        }
        None => false,
    }
}
