//! Channel fan-out and the legacy shared-secret scheme
//!
//! This example demonstrates:
//! - Sealing one channel message separately for every member
//! - Storing content with an explicit plaintext/encrypted choice
//! - A conversation configured for the legacy X25519 shared-secret scheme
//!
//! Run with: cargo run --example group_channel

use parley_crypto::{
    CryptoConfig, ExchangeKeyPair, KeyStrength, MessageProtector, OpenWith, ProtectedContent,
    SealFor,
};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    println!("👥 Parley - Channel Example\n");

    let config = CryptoConfig::default()
        .with_identity_key_strength(KeyStrength::Rsa2048)
        .with_shared_secret();
    let protector = MessageProtector::new(config)?;

    // ==================== Channel Fan-out ====================

    let members = (0..3)
        .map(|_| protector.generate_identity())
        .collect::<Result<Vec<_>, _>>()?;
    let public_keys: Vec<_> = members.iter().map(|m| m.public_key().clone()).collect();

    let envelopes = protector.seal_for_members("All hands moved to 3pm", &public_keys)?;
    println!("📨 Sealed {} envelopes for the channel", envelopes.len());

    for (i, (member, envelope)) in members.iter().zip(&envelopes).enumerate() {
        let text = protector.open(envelope, OpenWith::Identity(member.private_key()))?;
        println!("   member {i} reads: \"{text}\"");
    }

    // ==================== Stored Content ====================

    let announcement = protector.protect("Welcome to #general", None)?;
    let secret = protector.protect(
        "Offsite budget: see doc",
        Some(SealFor::Identity(&public_keys[0])),
    )?;
    for content in [&announcement, &secret] {
        let stored = serde_json::to_string(content)?;
        let kind = if content.is_encrypted() { "encrypted" } else { "plain" };
        println!("\n💾 stored ({kind}): {}…", &stored[..stored.len().min(72)]);
    }
    if let ProtectedContent::Encrypted(_) = &secret {
        let text = protector.reveal(&secret, OpenWith::Identity(members[0].private_key()))?;
        println!("   revealed for member 0: \"{text}\"");
    }

    // ==================== Legacy Shared Secret ====================

    let carol = ExchangeKeyPair::generate()?;
    let dave = ExchangeKeyPair::generate()?;
    let envelope = protector.seal(
        "legacy conversation still works",
        SealFor::Exchange { local: &carol, peer: dave.public_key() },
    )?;
    println!("\n🗝️  shared-secret envelope: {}", envelope.algorithm_id());
    println!("   dave reads:  \"{}\"", protector.open(&envelope, OpenWith::Exchange(&dave))?);
    println!("   carol reads: \"{}\"", protector.open(&envelope, OpenWith::Exchange(&carol))?);

    println!("\n✅ Done");
    Ok(())
}
