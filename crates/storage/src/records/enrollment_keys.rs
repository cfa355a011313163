// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use fleet_core::EnrollmentApiKey;

use crate::index::{FIELD_API_KEY_ID, FLEET_ENROLLMENT_API_KEYS};
use crate::query::Query;
use crate::store::{DocumentStore, StoreError};

/// Look up the enrollment key record whose `api_key_id` is `api_key_id`.
///
/// No match is [`StoreError::NotFound`]. Inactive records are returned as
/// is; deciding what inactive means is the caller's business.
pub async fn find_enrollment_api_key<S: DocumentStore>(
    store: &S,
    api_key_id: &str,
) -> Result<EnrollmentApiKey, StoreError> {
    let query = Query::term(FIELD_API_KEY_ID, api_key_id).with_size(1);
    let result = store.search(FLEET_ENROLLMENT_API_KEYS, &query).await?;

    let Some(hit) = result.hits.into_iter().next() else {
        return Err(StoreError::NotFound {
            index: FLEET_ENROLLMENT_API_KEYS.to_string(),
            id: api_key_id.to_string(),
        });
    };

    let mut record: EnrollmentApiKey = hit.decode().map_err(|source| StoreError::Decode {
        index: FLEET_ENROLLMENT_API_KEYS.to_string(),
        id: hit.id.clone(),
        source,
    })?;
    record.id = hit.id;
    Ok(record)
}
