//! Vault orchestration: builds plaintext, seals it, talks to the store, and
//! adopts the store's echo as the new canonical state.
//!
//! ```text
//! Disconnected -> Connected -> VaultLoaded -> { ContentLoaded, Editing }
//!       ^________________________|  (master decryption failure or logout)
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::codec::content::{decrypt_content, encrypt_content, PasswordSettings};
use crate::codec::master::{decrypt_master, encrypt_master, Envelope};
use crate::config::ClientConfig;
use crate::error::{Result, UldaError};
use crate::model::{ContentBody, ContentRecord, ContentRef, MasterFile};
use crate::protocol::{
    ContentCreateRequest, ContentUpdateRequest, MasterInitRequest, MasterUpdateRequest,
};
use crate::session::RemoteSession;
use crate::signature::{compute_linked_hashes, SignatureRing};
use crate::traits::channel::AckChannel;
use crate::traits::random::SecureRandom;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connected,
    VaultLoaded,
    ContentLoaded,
    Editing,
}

impl SessionState {
    pub fn has_vault(&self) -> bool {
        matches!(
            self,
            SessionState::VaultLoaded | SessionState::ContentLoaded | SessionState::Editing
        )
    }
}

/// A content record the store holds but the master file does not reference yet.
///
/// Hand it to `VaultClient::link_content` to retry only the linking step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingLink {
    pub id: u64,
    pub settings: PasswordSettings,
}

/// Result of a fully linked `create_content`.
#[derive(Debug, Clone)]
pub struct CreatedContent {
    pub master: MasterFile,
    pub record: ContentRecord,
}

/// A record that could not be produced by `list_content`.
#[derive(Debug)]
pub struct RecordFailure {
    pub id: u64,
    pub error: UldaError,
}

/// Decrypted records keyed by name, plus the ids that failed individually.
#[derive(Debug, Default)]
pub struct ContentListing {
    pub records: BTreeMap<String, ContentRecord>,
    pub failures: Vec<RecordFailure>,
}

impl ContentListing {
    pub fn get(&self, name: &str) -> Option<&ContentRecord> {
        self.records.get(name)
    }

    pub fn payload(&self, name: &str) -> Option<&Value> {
        self.records.get(name).map(|record| &record.payload)
    }

    /// Name-to-payload view of the listing.
    pub fn payloads(&self) -> BTreeMap<String, Value> {
        self.records
            .iter()
            .map(|(name, record)| (name.clone(), record.payload.clone()))
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

struct Credentials {
    api_key: String,
    password: Zeroizing<String>,
}

/// One user's session against the remote store.
///
/// Mutating operations take `&mut self`, so two `update_vault` calls on the
/// same client can never interleave and desynchronize the master ring.
pub struct VaultClient<C, R> {
    session: RemoteSession<C>,
    rng: R,
    config: ClientConfig,
    credentials: Option<Credentials>,
    state: SessionState,
}

impl<C, R> fmt::Debug for VaultClient<C, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VaultClient")
            .field("state", &self.state)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<C: AckChannel, R: SecureRandom> VaultClient<C, R> {
    /// Wrap an already connected channel.
    pub fn new(channel: C, rng: R, config: ClientConfig) -> Self {
        let session = RemoteSession::new(channel, config.call_timeout);
        Self {
            session,
            rng,
            config,
            credentials: None,
            state: SessionState::Connected,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn session(&self) -> &RemoteSession<C> {
        &self.session
    }

    /// Forget credentials and return to `Disconnected`.
    pub fn logout(&mut self) {
        info!("logging out");
        self.disconnect();
    }

    /// Create and upload a brand-new master file, then open the store's echo.
    pub async fn create_vault(&mut self, api_key: &str, password: &str) -> Result<MasterFile> {
        if self.state.has_vault() {
            return Err(UldaError::NotReady(format!(
                "cannot create a vault while one is loaded (state {:?})",
                self.state
            )));
        }

        let master = MasterFile {
            signatures: SignatureRing::seed(&self.rng)?,
            files: Vec::new(),
        };
        let envelope = encrypt_master(&master, password, self.config.pbkdf2_iterations, &self.rng)?;
        let hashes = compute_linked_hashes(&master.signatures, None, None)?;

        let request = MasterInitRequest {
            key: api_key.to_string(),
            metadata: envelope.metadata_json()?,
            data: envelope.ciphertext.clone(),
            hash_signatures: to_json_string(&hashes)?,
        };
        let echoed = self.session.master_init(&request).await?;

        let master = self.adopt_master(&echoed, password)?;
        self.login(api_key, password);
        info!(ring_min = ?master.signatures.min_index(), "vault created");
        Ok(master)
    }

    /// Fetch and open the master file for `api_key`.
    pub async fn get_vault(&mut self, api_key: &str, password: &str) -> Result<MasterFile> {
        let envelope = self.session.master_get(api_key).await?;
        let master = self.adopt_master(&envelope, password)?;
        self.login(api_key, password);
        info!(files = master.files.len(), "vault loaded");
        Ok(master)
    }

    /// Advance the master ring, re-seal `master`, and return the store's
    /// authoritative echo. `master` itself is never modified.
    pub async fn update_vault(&mut self, master: &MasterFile) -> Result<MasterFile> {
        self.require_vault()?;

        let mut next = master.clone();
        next.signatures.step_up(&self.rng)?;
        let new_hashes = compute_linked_hashes(&next.signatures, None, None)?;

        let (api_key, envelope) = {
            let credentials = self.credentials()?;
            let envelope = encrypt_master(
                &next,
                &credentials.password,
                self.config.pbkdf2_iterations,
                &self.rng,
            )?;
            (credentials.api_key.clone(), envelope)
        };

        let request = MasterUpdateRequest {
            key: api_key,
            metadata: envelope.metadata_json()?,
            data: envelope.ciphertext,
            new_hashes,
        };
        let echoed = self.session.master_update(&request).await?;

        let opened = {
            let credentials = self.credentials()?;
            decrypt_master::<MasterFile>(&echoed, &credentials.password)
        };
        let canonical = self.settle_master(opened)?;
        info!(ring_min = ?canonical.signatures.min_index(), "master file updated");
        Ok(canonical)
    }

    /// Fetch and decrypt every record the master file references.
    ///
    /// Records fail individually: a missing key entry, a record the store did
    /// not return, a record that will not decrypt, or a second record under an
    /// already listed name lands in `failures` while the rest are still
    /// returned. Only channel-level errors fail the call.
    pub async fn list_content(&mut self, master: &MasterFile) -> Result<ContentListing> {
        self.require_vault()?;

        let requested = master.content_ids();
        let items = self.session.content_get(requested.clone()).await?;
        let mut listing = ContentListing::default();

        for item in &items {
            let decoded = master
                .require_settings(item.id)
                .and_then(|settings| decrypt_content::<ContentBody>(&item.data, settings));
            match decoded {
                Ok(body) => match listing.records.get(&body.name) {
                    Some(kept) => {
                        let error = UldaError::Consistency(format!(
                            "content name {:?} already used by record {}",
                            body.name, kept.id
                        ));
                        warn!(id = item.id, kept = kept.id, "duplicate content name");
                        listing.failures.push(RecordFailure { id: item.id, error });
                    }
                    None => {
                        listing
                            .records
                            .insert(body.name.clone(), ContentRecord::from_body(item.id, body));
                    }
                },
                Err(error) => {
                    warn!(id = item.id, %error, "content record could not be opened");
                    listing.failures.push(RecordFailure { id: item.id, error });
                }
            }
        }

        for id in requested {
            if !items.iter().any(|item| item.id == id) {
                warn!(id, "store returned no record for referenced id");
                listing.failures.push(RecordFailure {
                    id,
                    error: UldaError::Consistency(format!("store holds no content record {id}")),
                });
            }
        }

        debug!(
            records = listing.records.len(),
            failures = listing.failures.len(),
            "content listed"
        );
        self.state = SessionState::ContentLoaded;
        Ok(listing)
    }

    /// Encrypt a new record under fresh key material, store it, then link it
    /// into the master file.
    ///
    /// The two steps are not atomic. If linking fails, the error is
    /// `OrphanedContent` carrying a `PendingLink`; retry with `link_content`
    /// rather than calling this again.
    pub async fn create_content(
        &mut self,
        master: &MasterFile,
        payload: Value,
        name: &str,
    ) -> Result<CreatedContent> {
        self.require_vault()?;

        let settings = PasswordSettings::generate(&self.rng)?;
        let body = ContentBody {
            name: name.to_string(),
            signatures: SignatureRing::seed(&self.rng)?,
            payload,
        };
        let data = encrypt_content(&body, &settings, &self.rng)?;
        let hashes = compute_linked_hashes(&body.signatures, None, None)?;

        let request = ContentCreateRequest {
            data,
            hash_signatures: to_json_string(&hashes)?,
        };
        let id = self.session.content_create(&request).await?;
        info!(id, "content record created");
        self.state = SessionState::Editing;

        let pending = PendingLink { id, settings };
        match self.link_content(master, &pending).await {
            Ok(master) => Ok(CreatedContent {
                master,
                record: ContentRecord::from_body(id, body),
            }),
            Err(source) => {
                warn!(id, error = %source, "content created but master link failed");
                Err(UldaError::OrphanedContent {
                    pending,
                    source: Box::new(source),
                })
            }
        }
    }

    /// Reference an already stored record from the master file.
    ///
    /// Safe to repeat: an id that is already present is not added twice.
    pub async fn link_content(
        &mut self,
        master: &MasterFile,
        pending: &PendingLink,
    ) -> Result<MasterFile> {
        self.require_vault()?;
        pending.settings.validate()?;

        let mut next = master.clone();
        if !next.contains(pending.id) {
            next.files.push(ContentRef {
                id: pending.id,
                settings: pending.settings.clone(),
            });
        }

        let canonical = self.update_vault(&next).await?;
        if !canonical.contains(pending.id) {
            return Err(UldaError::Consistency(format!(
                "store echo does not reference content {}",
                pending.id
            )));
        }
        Ok(canonical)
    }

    /// Replace the payload of record `id`, advancing that record's own ring.
    pub async fn update_content(
        &mut self,
        master: &MasterFile,
        id: u64,
        payload: Value,
    ) -> Result<ContentRecord> {
        self.require_vault()?;
        let settings = master.require_settings(id)?;

        let items = self.session.content_get(vec![id]).await?;
        let current = items
            .into_iter()
            .find(|item| item.id == id)
            .ok_or_else(|| UldaError::Consistency(format!("store holds no content record {id}")))?;

        let mut body: ContentBody = decrypt_content(&current.data, settings)?;
        body.signatures.step_up(&self.rng)?;
        body.payload = payload;
        let new_hashes = compute_linked_hashes(&body.signatures, None, None)?;
        let data = encrypt_content(&body, settings, &self.rng)?;

        let acked = self
            .session
            .content_update(&ContentUpdateRequest {
                id,
                data,
                new_hashes,
            })
            .await?;
        if acked != id {
            return Err(UldaError::Protocol(format!(
                "content:update for {id} acknowledged id {acked}"
            )));
        }

        info!(id, ring_min = ?body.signatures.min_index(), "content record updated");
        self.state = SessionState::Editing;
        Ok(ContentRecord::from_body(id, body))
    }

    fn require_vault(&self) -> Result<()> {
        if self.state.has_vault() && self.credentials.is_some() {
            Ok(())
        } else {
            Err(UldaError::NotReady(format!(
                "no vault loaded (state {:?})",
                self.state
            )))
        }
    }

    fn credentials(&self) -> Result<&Credentials> {
        self.credentials
            .as_ref()
            .ok_or_else(|| UldaError::NotReady("no credentials held".into()))
    }

    fn login(&mut self, api_key: &str, password: &str) {
        self.credentials = Some(Credentials {
            api_key: api_key.to_string(),
            password: Zeroizing::new(password.to_string()),
        });
        self.state = SessionState::VaultLoaded;
    }

    fn disconnect(&mut self) {
        self.credentials = None;
        self.state = SessionState::Disconnected;
    }

    fn adopt_master(&mut self, envelope: &Envelope, password: &str) -> Result<MasterFile> {
        let opened = decrypt_master::<MasterFile>(envelope, password);
        self.settle_master(opened)
    }

    /// An undecryptable or malformed master file ends the session.
    fn settle_master(&mut self, opened: Result<MasterFile>) -> Result<MasterFile> {
        let checked = opened.and_then(|master| master.validate().map(|_| master));
        if let Err(error) = &checked {
            warn!(%error, "master file rejected, disconnecting");
            self.disconnect();
        }
        checked
    }
}

fn to_json_string<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| UldaError::Serialization(e.to_string()))
}
