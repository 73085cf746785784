use std::path::{Path, PathBuf};

use aes::cipher::{KeyIvInit, StreamCipher};
use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::Sha256;

use crate::{Res, error::Error, types::TokenSet};

type Aes128Ctr = ctr::Ctr128BE<aes::Aes128>;
type HmacSha256 = Hmac<Sha256>;

const MAGIC: &[u8; 4] = b"SPB1";
const IV_LEN: usize = 16;
const TAG_LEN: usize = 32;

// Shipped inside the binary: this keeps tokens away from casual inspection of
// the data directory and nothing more.
const CIPHER_KEY: [u8; 16] = *b"spotbar.tokens.k";
const MAC_KEY: &[u8] = b"spotbar.tokens.mac.v1";

/// Encrypted, atomically written file holding the current [`TokenSet`].
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn save(&self, tokens: &TokenSet) -> Res<()> {
        if let Some(parent) = self.path.parent() {
            async_fs::create_dir_all(parent).await?;
        }

        let plaintext = serde_json::to_vec(tokens)?;
        let sealed = seal(&plaintext)?;

        let tmp = self.tmp_path();
        async_fs::write(&tmp, sealed).await?;
        if let Err(e) = async_fs::rename(&tmp, &self.path).await {
            let _ = async_fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    /// `Ok(None)` when nothing has been stored yet.
    pub async fn load(&self) -> Res<Option<TokenSet>> {
        let sealed = match async_fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let plaintext = open(&sealed)?;
        let tokens = serde_json::from_slice(&plaintext)?;
        Ok(Some(tokens))
    }

    /// Removing an absent file is success.
    pub async fn clear(&self) -> Res<()> {
        match async_fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

fn mac() -> Res<HmacSha256> {
    HmacSha256::new_from_slice(MAC_KEY).map_err(|e| Error::Decryption(e.to_string()))
}

/// `MAGIC | IV | AES-128-CTR(plaintext) | HMAC-SHA256(MAGIC | IV | ciphertext)`
fn seal(plaintext: &[u8]) -> Res<Vec<u8>> {
    let mut iv = [0u8; IV_LEN];
    rand::rng().fill(&mut iv);

    let mut body = plaintext.to_vec();
    let mut cipher = Aes128Ctr::new(&CIPHER_KEY.into(), &iv.into());
    cipher.apply_keystream(&mut body);

    let mut out = Vec::with_capacity(MAGIC.len() + IV_LEN + body.len() + TAG_LEN);
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&iv);
    out.extend_from_slice(&body);

    let mut mac = mac()?;
    mac.update(&out);
    out.extend_from_slice(&mac.finalize().into_bytes());
    Ok(out)
}

fn open(sealed: &[u8]) -> Res<Vec<u8>> {
    let header = MAGIC.len() + IV_LEN;
    if sealed.len() < header + TAG_LEN {
        return Err(Error::Decryption("file is truncated".to_string()));
    }
    if &sealed[..MAGIC.len()] != MAGIC {
        return Err(Error::Decryption("unknown file format".to_string()));
    }

    let (signed, tag) = sealed.split_at(sealed.len() - TAG_LEN);
    let mut mac = mac()?;
    mac.update(signed);
    mac.verify_slice(tag)
        .map_err(|_| Error::Decryption("integrity check failed".to_string()))?;

    let mut iv = [0u8; IV_LEN];
    iv.copy_from_slice(&signed[MAGIC.len()..header]);
    let mut body = signed[header..].to_vec();
    let mut cipher = Aes128Ctr::new(&CIPHER_KEY.into(), &iv.into());
    cipher.apply_keystream(&mut body);
    Ok(body)
}
