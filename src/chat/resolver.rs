use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::models::UserIdentity;
use super::repository::ChatRepository;
use crate::shared::AppError;

/// Number of identifier characters contributed by each participant
const ROOM_ID_PREFIX_LEN: usize = 3;

/// Derives the room ID for a pair of participants
///
/// The ID is a deterministic function of the unordered pair: the two
/// identities are ordered by account-creation time (ties broken by
/// lexicographic identifier comparison) and the first three characters of
/// each ordered identifier are concatenated. Deriving also materialises
/// the room row idempotently.
pub struct RoomIdResolver {
    repository: Arc<dyn ChatRepository + Send + Sync>,
}

impl RoomIdResolver {
    pub fn new(repository: Arc<dyn ChatRepository + Send + Sync>) -> Self {
        Self { repository }
    }

    /// Resolves a username pair to its room ID, creating the room row if needed
    ///
    /// Commutative: `derive_room_id(a, b) == derive_room_id(b, a)`.
    #[instrument(skip(self))]
    pub async fn derive_room_id(&self, user_a: &str, user_b: &str) -> Result<String, AppError> {
        let identity_a = self.repository.get_user_identity(user_a).await?;
        let identity_b = self.repository.get_user_identity(user_b).await?;

        let (first, second) = order_pair(identity_a, identity_b);
        let room_id = format!("{}{}", id_prefix(&first)?, id_prefix(&second)?);

        debug!(room_id = %room_id, "Derived room ID for pair");

        self.repository
            .ensure_room(&room_id, &first.id, &second.id)
            .await?;

        info!(room_id = %room_id, "Room ensured for pair");
        Ok(room_id)
    }
}

/// Orders two identities by creation time, ties broken by identifier
fn order_pair(a: UserIdentity, b: UserIdentity) -> (UserIdentity, UserIdentity) {
    if (a.created_at, &a.id) <= (b.created_at, &b.id) {
        (a, b)
    } else {
        (b, a)
    }
}

fn id_prefix(identity: &UserIdentity) -> Result<String, AppError> {
    let prefix: String = identity.id.chars().take(ROOM_ID_PREFIX_LEN).collect();
    if prefix.chars().count() < ROOM_ID_PREFIX_LEN {
        warn!(user_id = %identity.id, "Identifier too short for room ID prefix");
        return Err(AppError::Internal);
    }
    Ok(prefix)
}
