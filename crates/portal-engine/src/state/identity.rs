use portal_core::errors::StoreError;
use portal_core::keys::CLIENT_IDENTITY_KEY;
use portal_core::traits::KeyValueStore;
use rand::distributions::Alphanumeric;
use rand::Rng;

/// The install's client identity, generated and persisted on first use.
pub fn client_identity(store: &dyn KeyValueStore) -> Result<String, StoreError> {
    if let Some(id) = store.get_string(CLIENT_IDENTITY_KEY)? {
        return Ok(id);
    }
    let id = generate_identity(&mut rand::thread_rng());
    store.set(CLIENT_IDENTITY_KEY, serde_json::Value::String(id.clone()))?;
    tracing::info!(client_identity = %id, "generated client identity");
    Ok(id)
}

/// Random alphanumeric token of 10 to 20 characters.
pub fn generate_identity<R: Rng>(rng: &mut R) -> String {
    let len = rng.gen_range(10..=20);
    (0..len).map(|_| char::from(rng.sample(Alphanumeric))).collect()
}
