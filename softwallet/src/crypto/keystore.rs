//! Web3 Secret Storage (v3) keystores: scrypt or PBKDF2-HMAC-SHA256 key
//! derivation, AES-128-CTR encryption, Keccak-256 MAC.

use aes::Aes128;
use async_trait::async_trait;
use ctr::cipher::{KeyIvInit, StreamCipher};
use rand::rngs::OsRng;
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use super::{keccak256, KeystoreDecryption};
use crate::account::Account;
use crate::errors::CryptoError;
use crate::secret::{SigningMaterial, PRIVATE_KEY_LEN};
use crate::validation::InputValidator;

type Aes128Ctr = ctr::Ctr128BE<Aes128>;

const KEYSTORE_VERSION: u32 = 3;
const CIPHER: &str = "aes-128-ctr";
const PRF: &str = "hmac-sha256";
const DKLEN: usize = 32;
const SALT_LEN: usize = 32;
const IV_LEN: usize = 16;
const MAX_SCRYPT_LOG_N: u8 = 20;
const MAX_SCRYPT_R: u32 = 32;
const MAX_SCRYPT_P: u32 = 16;
/// Upper bound on scrypt working memory, `128 * r * (n + p)` bytes.
const MAX_SCRYPT_MEMORY: u64 = 2 << 30;
const MAX_PBKDF2_ROUNDS: u32 = 10_000_000;

/// Scrypt strength used when encrypting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeystoreParams {
    pub log_n: u8,
    pub r: u32,
    pub p: u32,
}

impl KeystoreParams {
    /// n = 2^18, r = 8, p = 1.
    pub fn standard() -> Self {
        Self {
            log_n: 18,
            r: 8,
            p: 1,
        }
    }

    /// n = 2^12, r = 8, p = 6.
    pub fn light() -> Self {
        Self {
            log_n: 12,
            r: 8,
            p: 6,
        }
    }

    /// Check the parameters against the accepted scrypt bounds.
    pub fn validate(&self) -> Result<(), CryptoError> {
        self.scrypt_params().map(|_| ())
    }

    fn scrypt_params(&self) -> Result<scrypt::Params, CryptoError> {
        if self.log_n == 0 || self.log_n > MAX_SCRYPT_LOG_N {
            return Err(CryptoError::new(format!(
                "scrypt log_n must be within 1..={MAX_SCRYPT_LOG_N}"
            )));
        }
        if self.r == 0 || self.r > MAX_SCRYPT_R {
            return Err(CryptoError::new(format!(
                "scrypt r must be within 1..={MAX_SCRYPT_R}"
            )));
        }
        if self.p == 0 || self.p > MAX_SCRYPT_P {
            return Err(CryptoError::new(format!(
                "scrypt p must be within 1..={MAX_SCRYPT_P}"
            )));
        }
        let memory = 128 * u64::from(self.r) * ((1u64 << self.log_n) + u64::from(self.p));
        if memory > MAX_SCRYPT_MEMORY {
            return Err(CryptoError::new("scrypt parameters exceed the memory budget"));
        }
        scrypt::Params::new(self.log_n, self.r, self.p, DKLEN)
            .map_err(|e| CryptoError::new(format!("invalid scrypt parameters: {e}")))
    }
}

impl Default for KeystoreParams {
    fn default() -> Self {
        Self::standard()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct KeystoreFile {
    version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    address: Option<String>,
    #[serde(alias = "Crypto")]
    crypto: CryptoSection,
}

#[derive(Debug, Serialize, Deserialize)]
struct CryptoSection {
    cipher: String,
    cipherparams: CipherParams,
    ciphertext: String,
    kdf: String,
    kdfparams: serde_json::Value,
    mac: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct CipherParams {
    iv: String,
}

#[derive(Debug, Deserialize)]
struct ScryptKdf {
    dklen: usize,
    n: u64,
    r: u32,
    p: u32,
    salt: String,
}

#[derive(Debug, Deserialize)]
struct Pbkdf2Kdf {
    c: u32,
    dklen: usize,
    prf: String,
    salt: String,
}

/// Web3 v3 keystore codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct Web3Keystore;

impl Web3Keystore {
    pub fn new() -> Self {
        Self
    }

    /// Decrypt a keystore payload into an account.
    pub fn decrypt(&self, payload: &str, password: &[u8]) -> Result<Account, CryptoError> {
        InputValidator::new()
            .validate_keystore_size(payload)
            .map_err(|e| CryptoError::new(e.to_string()))?;
        let file: KeystoreFile = serde_json::from_str(payload)
            .map_err(|e| CryptoError::new(format!("malformed keystore: {e}")))?;
        if file.version != KEYSTORE_VERSION {
            return Err(CryptoError::new(format!(
                "unsupported keystore version {}",
                file.version
            )));
        }

        let crypto = &file.crypto;
        if crypto.cipher != CIPHER {
            return Err(CryptoError::new(format!(
                "unsupported cipher {}",
                crypto.cipher
            )));
        }
        let iv = decode_hex(&crypto.cipherparams.iv, "iv")?;
        if iv.len() != IV_LEN {
            return Err(CryptoError::new("iv must be 16 bytes"));
        }
        let ciphertext = decode_hex(&crypto.ciphertext, "ciphertext")?;
        let expected_mac = decode_hex(&crypto.mac, "mac")?;

        let derived = derive_key(&crypto.kdf, &crypto.kdfparams, password)?;

        let mac = compute_mac(&derived, &ciphertext);
        if !bool::from(mac.as_slice().ct_eq(expected_mac.as_slice())) {
            return Err(CryptoError::new("mac mismatch"));
        }

        let mut plaintext = Zeroizing::new(ciphertext);
        apply_ctr(&derived[..16], &iv, &mut plaintext)?;
        if plaintext.len() != PRIVATE_KEY_LEN {
            return Err(CryptoError::new("decrypted key has unexpected length"));
        }

        let signing = SigningMaterial::from_slice(&plaintext)?;
        Ok(Account::from_signing_material(signing))
    }

    /// Encrypt signing material into a scrypt keystore JSON document.
    pub fn encrypt(
        &self,
        signing: &SigningMaterial,
        password: &[u8],
        params: KeystoreParams,
    ) -> Result<String, CryptoError> {
        let scrypt_params = params.scrypt_params()?;

        let mut salt = [0u8; SALT_LEN];
        let mut iv = [0u8; IV_LEN];
        OsRng.fill_bytes(&mut salt);
        OsRng.fill_bytes(&mut iv);

        let mut derived = Zeroizing::new([0u8; DKLEN]);
        scrypt::scrypt(password, &salt, &scrypt_params, &mut derived[..])
            .map_err(|e| CryptoError::new(format!("scrypt failed: {e}")))?;

        let key_bytes = signing.to_bytes();
        let mut ciphertext = key_bytes.to_vec();
        apply_ctr(&derived[..16], &iv, &mut ciphertext)?;
        let mac = compute_mac(&derived[..], &ciphertext);

        let address = crate::account::Address::from_verifying_key(signing.verifying_key());
        let file = KeystoreFile {
            version: KEYSTORE_VERSION,
            id: Some(uuid::Uuid::new_v4().to_string()),
            address: Some(hex::encode(address.as_bytes())),
            crypto: CryptoSection {
                cipher: CIPHER.to_string(),
                cipherparams: CipherParams {
                    iv: hex::encode(iv),
                },
                ciphertext: hex::encode(&ciphertext),
                kdf: "scrypt".to_string(),
                kdfparams: serde_json::json!({
                    "dklen": DKLEN,
                    "n": 1u64 << params.log_n,
                    "r": params.r,
                    "p": params.p,
                    "salt": hex::encode(salt),
                }),
                mac: hex::encode(mac),
            },
        };

        serde_json::to_string(&file)
            .map_err(|e| CryptoError::new(format!("keystore serialization failed: {e}")))
    }
}

#[async_trait]
impl KeystoreDecryption for Web3Keystore {
    async fn recover(
        &self,
        payload: &str,
        password: &SecretString,
    ) -> Result<Account, CryptoError> {
        let codec = *self;
        let payload = payload.to_string();
        let password = Zeroizing::new(password.expose_secret().as_bytes().to_vec());

        tokio::task::spawn_blocking(move || codec.decrypt(&payload, &password))
            .await
            .map_err(|e| CryptoError::new(format!("keystore task failed: {e}")))?
    }
}

fn derive_key(
    kdf: &str,
    params: &serde_json::Value,
    password: &[u8],
) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    match kdf {
        "scrypt" => {
            let params: ScryptKdf = serde_json::from_value(params.clone())
                .map_err(|e| CryptoError::new(format!("malformed scrypt params: {e}")))?;
            if params.dklen != DKLEN {
                return Err(CryptoError::new("dklen must be 32"));
            }
            if params.n < 2 || !params.n.is_power_of_two() {
                return Err(CryptoError::new("scrypt n must be a power of two"));
            }
            let log_n = params.n.trailing_zeros() as u8;
            let strength = KeystoreParams {
                log_n,
                r: params.r,
                p: params.p,
            };
            let salt = decode_hex(&params.salt, "salt")?;
            let mut derived = Zeroizing::new(vec![0u8; DKLEN]);
            scrypt::scrypt(password, &salt, &strength.scrypt_params()?, &mut derived)
                .map_err(|e| CryptoError::new(format!("scrypt failed: {e}")))?;
            Ok(derived)
        }
        "pbkdf2" => {
            let params: Pbkdf2Kdf = serde_json::from_value(params.clone())
                .map_err(|e| CryptoError::new(format!("malformed pbkdf2 params: {e}")))?;
            if params.dklen != DKLEN {
                return Err(CryptoError::new("dklen must be 32"));
            }
            if params.prf != PRF {
                return Err(CryptoError::new(format!("unsupported prf {}", params.prf)));
            }
            if params.c == 0 || params.c > MAX_PBKDF2_ROUNDS {
                return Err(CryptoError::new("pbkdf2 round count out of range"));
            }
            let salt = decode_hex(&params.salt, "salt")?;
            let mut derived = Zeroizing::new(vec![0u8; DKLEN]);
            pbkdf2::pbkdf2_hmac::<Sha256>(password, &salt, params.c, &mut derived);
            Ok(derived)
        }
        other => Err(CryptoError::new(format!("unsupported kdf {other}"))),
    }
}

fn compute_mac(derived: &[u8], ciphertext: &[u8]) -> [u8; 32] {
    let mut input = Zeroizing::new(Vec::with_capacity(16 + ciphertext.len()));
    input.extend_from_slice(&derived[16..32]);
    input.extend_from_slice(ciphertext);
    keccak256(&input)
}

fn apply_ctr(key: &[u8], iv: &[u8], buffer: &mut [u8]) -> Result<(), CryptoError> {
    let mut cipher = Aes128Ctr::new_from_slices(key, iv)
        .map_err(|_| CryptoError::new("invalid cipher key or iv length"))?;
    cipher.apply_keystream(buffer);
    Ok(())
}

fn decode_hex(value: &str, field: &str) -> Result<Vec<u8>, CryptoError> {
    let body = value.strip_prefix("0x").unwrap_or(value);
    hex::decode(body).map_err(|_| CryptoError::new(format!("{field} is not valid hex")))
}

// Web3 Secret Storage PBKDF2 test vector, password "testpassword".
#[cfg(test)]
pub(crate) const PBKDF2_TEST_VECTOR: &str = r#"{
    "crypto": {
        "cipher": "aes-128-ctr",
        "cipherparams": { "iv": "6087dab2f9fdbbfaddc31a909735c1e6" },
        "ciphertext": "5318b4d5bcd28de64ee5559e671353e16f075ecae9f99c7a79a38af5f869aa46",
        "kdf": "pbkdf2",
        "kdfparams": {
            "c": 262144,
            "dklen": 32,
            "prf": "hmac-sha256",
            "salt": "ae3cd4e7013836a3df6bd7241b12db061dbe2c6785853cce422d148a624ce0bd"
        },
        "mac": "517ead924a9d0dc3124507e3393d175ce3ff7c1e96529c6c555ce9e51205e9b2"
    },
    "id": "3198bc9c-6672-5ab3-d995-4942343ae5b6",
    "version": 3
}"#;

#[cfg(test)]
mod tests {
    use super::*;

    fn light() -> KeystoreParams {
        KeystoreParams {
            log_n: 10,
            r: 8,
            p: 1,
        }
    }

    #[test]
    fn decrypts_pbkdf2_vector() {
        let account = Web3Keystore::new()
            .decrypt(PBKDF2_TEST_VECTOR, b"testpassword")
            .unwrap();
        assert_eq!(
            hex::encode(*account.signing_material().to_bytes()),
            "7a28b5ba57c53603b0b07b56bba752f7784bf506fa95edc395f5cf6c7514fe9d"
        );
        assert_eq!(
            account.address().to_lower_hex(),
            "0x008aeeda4d805471df9b2a5b0f38a0c3bcba786b"
        );
    }

    #[test]
    fn wrong_password_fails_mac_check() {
        assert!(Web3Keystore::new()
            .decrypt(PBKDF2_TEST_VECTOR, b"wrongpassword")
            .is_err());
    }

    #[test]
    fn scrypt_round_trip() {
        let codec = Web3Keystore::new();
        let signing = SigningMaterial::from_slice(&[0x11u8; 32]).unwrap();
        let expected = crate::account::Address::from_verifying_key(signing.verifying_key());

        let payload = codec.encrypt(&signing, b"hunter2", light()).unwrap();
        assert!(!payload.contains(&hex::encode([0x11u8; 32])));

        let account = codec.decrypt(&payload, b"hunter2").unwrap();
        assert_eq!(account.address(), expected);
        assert!(codec.decrypt(&payload, b"hunter3").is_err());
    }

    #[test]
    fn capitalized_crypto_section_is_accepted() {
        let payload = PBKDF2_TEST_VECTOR.replacen("\"crypto\"", "\"Crypto\"", 1);
        assert!(Web3Keystore::new()
            .decrypt(&payload, b"testpassword")
            .is_ok());
    }

    #[test]
    fn rejects_unsupported_and_malformed_payloads() {
        let codec = Web3Keystore::new();
        assert!(codec.decrypt("not json", b"pw").is_err());

        let cbc = PBKDF2_TEST_VECTOR.replace("aes-128-ctr", "aes-128-cbc");
        assert!(codec.decrypt(&cbc, b"testpassword").is_err());

        let v2 = PBKDF2_TEST_VECTOR.replace("\"version\": 3", "\"version\": 2");
        assert!(codec.decrypt(&v2, b"testpassword").is_err());

        let sha512 = PBKDF2_TEST_VECTOR.replace("hmac-sha256", "hmac-sha512");
        assert!(codec.decrypt(&sha512, b"testpassword").is_err());
    }

    #[test]
    fn rejects_oversized_scrypt_parameters() {
        let codec = Web3Keystore::new();
        for kdfparams in [
            r#"{"dklen": 32, "n": 1048576, "r": 65536, "p": 1, "salt": "00"}"#,
            r#"{"dklen": 32, "n": 1024, "r": 8, "p": 4096, "salt": "00"}"#,
            r#"{"dklen": 32, "n": 1048576, "r": 32, "p": 1, "salt": "00"}"#,
        ] {
            let mut file: serde_json::Value = serde_json::from_str(PBKDF2_TEST_VECTOR).unwrap();
            file["crypto"]["kdf"] = "scrypt".into();
            file["crypto"]["kdfparams"] = serde_json::from_str(kdfparams).unwrap();
            let payload = file.to_string();
            assert!(codec.decrypt(&payload, b"testpassword").is_err(), "{kdfparams}");
        }

        assert!(KeystoreParams::standard().validate().is_ok());
        assert!(KeystoreParams::light().validate().is_ok());
        assert!(KeystoreParams {
            log_n: 20,
            r: 8,
            p: 1
        }
        .validate()
        .is_ok());
        assert!(KeystoreParams {
            log_n: 14,
            r: 0,
            p: 1
        }
        .validate()
        .is_err());
    }

    #[test]
    fn rejects_excessive_scrypt_cost() {
        let params = KeystoreParams {
            log_n: 30,
            r: 8,
            p: 1,
        };
        let signing = SigningMaterial::from_slice(&[0x22u8; 32]).unwrap();
        assert!(Web3Keystore::new()
            .encrypt(&signing, b"pw", params)
            .is_err());
    }

    #[tokio::test]
    async fn recover_runs_off_the_scheduler() {
        let password = SecretString::from("testpassword".to_string());
        let account = Web3Keystore::new()
            .recover(PBKDF2_TEST_VECTOR, &password)
            .await
            .unwrap();
        assert_eq!(
            account.address().to_lower_hex(),
            "0x008aeeda4d805471df9b2a5b0f38a0c3bcba786b"
        );
    }
}
