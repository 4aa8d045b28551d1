//! Direct message walkthrough for Parley end-to-end encryption
//!
//! This example demonstrates:
//! - Generating identity key pairs at account creation
//! - Exporting keys as PEM for the identity store
//! - Sealing a direct message into a hybrid envelope
//! - Carrying the envelope as a JSON string
//! - Opening it on the recipient side
//! - What a wrong recipient and a tampered envelope look like
//!
//! Run with: cargo run --example direct_message
//! Set `PARLEY_IDENTITY_KEY_BITS=2048` for faster key generation.

use parley_crypto::{
    CryptoConfig, EnvelopeCodec, IdentityKeyPair, IdentityPublicKey, MessageEnvelope,
    MessageProtector, OpenWith, SealFor,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "parley_crypto=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = CryptoConfig::from_env()?;
    tracing::info!(
        e2e = config.e2e_enabled,
        key_bits = config.identity_key_bits,
        "Loaded encryption config"
    );
    let protector = MessageProtector::new(config)?;

    println!("🔐 Parley - Direct Message Example\n");

    // ==================== Account Creation ====================

    let alice = protector.generate_identity()?;
    let bob = protector.generate_identity()?;
    println!("👤 Alice key: {}", alice.public_key().fingerprint());
    println!("👤 Bob key:   {}", bob.public_key().fingerprint());

    // The identity store keeps PEM; Alice fetches Bob's public half from it
    let bob_public_pem = bob.public_key().to_pem()?;
    let bob_private_pem = bob.private_key().to_pem()?;
    let bob_public = IdentityPublicKey::from_pem(&bob_public_pem)?;

    // ==================== Send ====================

    let wire = protector.seal_to_wire(
        "Quarterly numbers are due Friday",
        SealFor::Identity(&bob_public),
    )?;
    println!("\n📤 Envelope on the wire ({} bytes):", wire.len());
    let pretty: serde_json::Value = serde_json::from_str(&wire)?;
    println!("{}", serde_json::to_string_pretty(&pretty)?);

    // ==================== Receive ====================

    let bob_restored = IdentityKeyPair::from_private_pem(&bob_private_pem)?;
    let plaintext = protector.open_wire(&wire, OpenWith::Identity(bob_restored.private_key()))?;
    println!("\n📥 Bob reads: \"{plaintext}\"");

    // ==================== Failure Modes ====================

    match protector.open_wire(&wire, OpenWith::Identity(alice.private_key())) {
        Ok(_) => println!("\n❌ Alice should not be able to read Bob's message"),
        Err(e) => println!("\n🚫 Alice tries to open it: {e}"),
    }

    let mut envelope = EnvelopeCodec::parse(&wire)?;
    if let MessageEnvelope::Hybrid(env) = &mut envelope {
        if let Some(byte) = env.ciphertext.first_mut() {
            *byte ^= 0x01;
        }
    }
    match protector.open(&envelope, OpenWith::Identity(bob_restored.private_key())) {
        Ok(_) => println!("❌ Tampering went unnoticed"),
        Err(e) => println!("🚫 Tampered copy: {e}"),
    }

    println!("\n✅ Done");
    Ok(())
}
