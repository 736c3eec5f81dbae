use std::ops::Range;
use std::sync::Arc;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::account::Address;
use crate::crypto::{Bip39Derivation, MnemonicDerivation};
use crate::errors::ResolveError;
use crate::path::{DerivationPath, HARDENED_OFFSET};

pub const DEFAULT_PAGE_LIMIT: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub path: DerivationPath,
    pub limit: u32,
    pub page: u32,
}

impl PageRequest {
    pub fn new(path: DerivationPath, limit: u32, page: u32) -> Self {
        Self { path, limit, page }
    }

    /// `[page * limit, page * limit + limit)`, restricted to non-hardened indices.
    pub fn index_range(&self) -> Result<Range<u32>, ResolveError> {
        if self.limit == 0 {
            return Err(ResolveError::InvalidPageRequest(
                "limit must be greater than zero".to_string(),
            ));
        }
        let start = self
            .page
            .checked_mul(self.limit)
            .filter(|start| *start < HARDENED_OFFSET)
            .ok_or_else(|| {
                ResolveError::InvalidPageRequest(format!(
                    "page {} is beyond the derivable index space",
                    self.page
                ))
            })?;
        let end = start
            .checked_add(self.limit)
            .filter(|end| *end <= HARDENED_OFFSET)
            .ok_or_else(|| {
                ResolveError::InvalidPageRequest(format!(
                    "limit {} overruns the derivable index space",
                    self.limit
                ))
            })?;
        Ok(start..end)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(DerivationPath::default(), DEFAULT_PAGE_LIMIT, 0)
    }
}

/// Read-only address listing for mnemonic credentials. Never binds.
#[derive(Clone)]
pub struct AccountPager {
    derivation: Arc<dyn MnemonicDerivation>,
}

impl AccountPager {
    pub fn new(derivation: Arc<dyn MnemonicDerivation>) -> Self {
        Self { derivation }
    }

    pub async fn list(
        &self,
        phrase: &SecretString,
        password: Option<&SecretString>,
        request: &PageRequest,
    ) -> Result<Vec<Address>, ResolveError> {
        let range = request.index_range()?;

        let seed = self
            .derivation
            .seed(phrase, password)
            .await
            .map_err(|e| ResolveError::InvalidMnemonic(e.0))?;
        let addresses = self
            .derivation
            .derive_addresses(&seed, &request.path, range.clone())
            .map_err(|e| ResolveError::InvalidMnemonic(e.0))?;

        log::debug!(
            "Listed {} addresses under {} (indices {}..{})",
            addresses.len(),
            request.path,
            range.start,
            range.end
        );
        Ok(addresses)
    }
}

impl Default for AccountPager {
    fn default() -> Self {
        Self::new(Arc::new(Bip39Derivation::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::Account;
    use crate::errors::CryptoError;
    use crate::secret::Seed;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const PHRASE: &str =
        "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    fn secret(value: &str) -> SecretString {
        SecretString::from(value.to_string())
    }

    /// Wraps the real derivation and counts how often each stage runs.
    #[derive(Default)]
    struct CountingDerivation {
        inner: Bip39Derivation,
        seeds: AtomicUsize,
        accounts: AtomicUsize,
    }

    #[async_trait]
    impl MnemonicDerivation for CountingDerivation {
        async fn seed(
            &self,
            phrase: &SecretString,
            password: Option<&SecretString>,
        ) -> Result<Seed, CryptoError> {
            self.seeds.fetch_add(1, Ordering::SeqCst);
            self.inner.seed(phrase, password).await
        }

        fn derive_account(
            &self,
            seed: &Seed,
            path: &DerivationPath,
            index: u32,
        ) -> Result<Account, CryptoError> {
            self.accounts.fetch_add(1, Ordering::SeqCst);
            self.inner.derive_account(seed, path, index)
        }
    }

    #[tokio::test]
    async fn zero_limit_is_rejected_before_derivation() {
        let counting = Arc::new(CountingDerivation::default());
        let pager = AccountPager::new(counting.clone());
        let request = PageRequest::new(DerivationPath::ethereum(), 0, 0);

        let err = pager.list(&secret(PHRASE), None, &request).await.unwrap_err();
        assert!(matches!(err, ResolveError::InvalidPageRequest(_)));
        assert_eq!(counting.seeds.load(Ordering::SeqCst), 0);
        assert_eq!(counting.accounts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn pages_match_individual_indices() {
        let counting = Arc::new(CountingDerivation::default());
        let pager = AccountPager::new(counting.clone());
        let path = DerivationPath::ethereum();
        let hd = Bip39Derivation::new();
        let seed = hd.seed(&secret(PHRASE), None).await.unwrap();

        let first = pager
            .list(&secret(PHRASE), None, &PageRequest::new(path.clone(), 5, 0))
            .await
            .unwrap();
        assert_eq!(first.len(), 5);
        for (offset, address) in first.iter().enumerate() {
            let expected = hd.derive_address(&seed, &path, offset as u32).unwrap();
            assert_eq!(*address, expected);
        }
        assert_eq!(
            first[0].to_string(),
            "0x9858EfFD232B4033E47d90003D41EC34EcaEda94"
        );
        assert_eq!(counting.seeds.load(Ordering::SeqCst), 1);
        assert_eq!(counting.accounts.load(Ordering::SeqCst), 5);

        let second = pager
            .list(&secret(PHRASE), None, &PageRequest::new(path.clone(), 5, 1))
            .await
            .unwrap();
        for (offset, address) in second.iter().enumerate() {
            let expected = hd
                .derive_address(&seed, &path, 5 + offset as u32)
                .unwrap();
            assert_eq!(*address, expected);
        }
    }

    #[tokio::test]
    async fn listing_is_reproducible() {
        let pager = AccountPager::default();
        let request = PageRequest::new(DerivationPath::parse("m/44'/60'/0'").unwrap(), 3, 2);
        let a = pager.list(&secret(PHRASE), None, &request).await.unwrap();
        let b = pager.list(&secret(PHRASE), None, &request).await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn invalid_mnemonic_returns_no_partial_results() {
        let pager = AccountPager::default();
        let err = pager
            .list(&secret("invalid words"), None, &PageRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::InvalidMnemonic(_)));
    }

    #[test]
    fn index_range_bounds() {
        let path = DerivationPath::ethereum();
        assert_eq!(PageRequest::new(path.clone(), 5, 0).index_range().unwrap(), 0..5);
        assert_eq!(PageRequest::new(path.clone(), 5, 3).index_range().unwrap(), 15..20);
        assert!(PageRequest::new(path.clone(), u32::MAX, 2).index_range().is_err());
        assert!(PageRequest::new(path.clone(), 1, HARDENED_OFFSET).index_range().is_err());
        assert_eq!(
            PageRequest::new(path, 1, HARDENED_OFFSET - 1)
                .index_range()
                .unwrap(),
            (HARDENED_OFFSET - 1)..HARDENED_OFFSET
        );
    }
}
