// SPDX-License-Identifier: CC0-1.0

//! End-to-end tests of the signing wallet against its protocol contract.

use hex_lit::hex;
use num_bigint::BigUint;
use secp256k1::{Message, Secp256k1, ecdsa};

use signing_wallet::paths::{MESSAGE_BRANCH, MESSAGE_SIGNING_MAGIC};
use signing_wallet::sign_message::signed_msg_hash;
use signing_wallet::{
    ChildNumber, DerivationPath, EcdsaSighashType, ExtendedPrivKey, Network, OutPoint,
    PreparedTransaction, ScriptBuf, ScriptType, SighashCache, SigningWallet, SpendableOutput,
    Transaction, TxIn, TxOut, Txid,
};

use dashcore_hashes::Hash;

const SEED: [u8; 16] = hex!("000102030405060708090a0b0c0d0e0f");

fn wallet() -> SigningWallet {
    SigningWallet::from_seed(&SEED, Network::Mainnet).unwrap()
}

fn two_input_transaction() -> Transaction {
    Transaction {
        version: 1,
        lock_time: 0,
        input: vec![
            TxIn {
                previous_output: OutPoint { txid: Txid::all_zeros(), vout: 0 },
                script_sig: ScriptBuf::new(),
                sequence: 0xffffffff,
            },
            TxIn {
                previous_output: OutPoint {
                    txid: Txid::from_byte_array([0x11; 32]),
                    vout: 1,
                },
                script_sig: ScriptBuf::new(),
                sequence: 0xffffffff,
            },
        ],
        output: vec![TxOut {
            value: 90_000,
            script_pubkey: ScriptBuf::from_hex("76a914f54a5851e9372b87810a8e60cdd2e7cfd80b6e3188ac")
                .unwrap(),
        }],
    }
}

fn spendable(script_type: ScriptType, sub_account: u32, branch: u32, pointer: u32) -> SpendableOutput {
    SpendableOutput {
        script: ScriptBuf::from_hex("522103a0434d9e47f3c86235477c7b1ae6ae5d3442d49b1943c2b752a68e2a47e247c721036d2544d386e7f38e9f22f4c0bd7bb6e1bd2db9e51f1ab274a41d0d6b6b8f8f4e52ae").unwrap(),
        value: 100_000,
        script_type,
        sub_account,
        branch,
        pointer,
    }
}

/// Re-derives the key a `(sub_account, branch, pointer)` triple names, the
/// same way the wallet must.
fn expected_input_key(secp: &Secp256k1<secp256k1::All>, prev: &SpendableOutput) -> ExtendedPrivKey {
    let master = ExtendedPrivKey::new_master(&SEED).unwrap();
    let account = if prev.sub_account == 0 {
        master
    } else {
        master.derive_priv(
            secp,
            &[
                ChildNumber::from_hardened_idx(3).unwrap(),
                ChildNumber::from_hardened_idx(prev.sub_account).unwrap(),
            ],
        )
    };
    account.derive_priv(
        secp,
        &[
            ChildNumber::from_normal_idx(prev.branch).unwrap(),
            ChildNumber::from_normal_idx(prev.pointer).unwrap(),
        ],
    )
}

#[test]
fn signs_every_input_in_order_with_the_declared_key() {
    let secp = Secp256k1::new();
    let w = wallet();
    let tx = two_input_transaction();
    let prev_outputs = vec![
        spendable(ScriptType::P2sh, 0, 1, 7),
        spendable(ScriptType::P2shP2wsh, 2, 1, 42),
    ];
    let ptx = PreparedTransaction { tx: tx.clone(), prev_outputs: prev_outputs.clone() };

    let sigs = w.sign_transaction(&ptx).unwrap();
    assert_eq!(sigs.len(), 2);

    let cache = SighashCache::new(&tx);
    for (i, (sig_bytes, prev)) in sigs.iter().zip(&prev_outputs).enumerate() {
        // Sighash-all byte is appended after the DER body.
        assert_eq!(*sig_bytes.last().unwrap(), 0x01);
        let sig = ecdsa::Signature::from_der(&sig_bytes[..sig_bytes.len() - 1]).unwrap();

        let digest = match prev.script_type {
            ScriptType::P2sh => cache
                .legacy_signature_hash(i, &prev.script, EcdsaSighashType::All.to_u32())
                .unwrap()
                .to_byte_array(),
            ScriptType::P2shP2wsh => cache
                .segwit_v0_signature_hash(i, &prev.script, prev.value, EcdsaSighashType::All)
                .unwrap()
                .to_byte_array(),
        };
        let key = expected_input_key(&secp, prev);
        let pubkey = secp256k1::PublicKey::from_secret_key(&secp, &key.private_key);
        secp.verify_ecdsa(&Message::from_digest(digest), &sig, &pubkey)
            .expect("signature must verify against the declared input key");
    }
}

#[test]
fn transaction_signing_is_deterministic() {
    let w = wallet();
    let ptx = PreparedTransaction {
        tx: two_input_transaction(),
        prev_outputs: vec![
            spendable(ScriptType::P2sh, 0, 1, 7),
            spendable(ScriptType::P2shP2wsh, 2, 1, 42),
        ],
    };
    assert_eq!(w.sign_transaction(&ptx).unwrap(), w.sign_transaction(&ptx).unwrap());
}

#[test]
fn mismatched_previous_outputs_fail_without_partial_results() {
    let w = wallet();
    let ptx = PreparedTransaction {
        tx: two_input_transaction(),
        prev_outputs: vec![spendable(ScriptType::P2sh, 0, 1, 7)],
    };
    assert!(w.sign_transaction(&ptx).is_err());
}

#[test]
fn challenge_signature_round_trips_through_the_transmitted_path() {
    let secp = Secp256k1::new();
    let w = wallet();

    // 2^255, whose signed encoding carries the stripped leading zero byte.
    let challenge =
        "57896044618658097711785492504343953926634992332820282019728792003956564819968";
    let mut digest = [0u8; 32];
    digest[0] = 0x80;

    let answer = w.sign_challenge(challenge).unwrap();
    assert_eq!(answer.path.len(), 16);

    // The verifier's side: hex-decode the path, re-split it into big-endian
    // 16-bit steps, re-derive the child and check the signature.
    let nonce = hex::decode(&answer.path).unwrap();
    let steps: DerivationPath = nonce
        .chunks(2)
        .map(|pair| ChildNumber::from_normal_idx(u16::from_be_bytes([pair[0], pair[1]]) as u32).unwrap())
        .collect();
    let child = ExtendedPrivKey::new_master(&SEED).unwrap().derive_priv(&secp, &steps);
    let pubkey = secp256k1::PublicKey::from_secret_key(&secp, &child.private_key);

    let mut compact = [0u8; 64];
    let r = BigUint::parse_bytes(answer.r.as_bytes(), 10).unwrap().to_bytes_be();
    let s = BigUint::parse_bytes(answer.s.as_bytes(), 10).unwrap().to_bytes_be();
    compact[32 - r.len()..32].copy_from_slice(&r);
    compact[64 - s.len()..].copy_from_slice(&s);
    let sig = ecdsa::Signature::from_compact(&compact).unwrap();

    secp.verify_ecdsa(&Message::from_digest(digest), &sig, &pubkey)
        .expect("challenge signature must verify under the transmitted path");
}

#[test]
fn challenge_paths_are_fresh_per_call() {
    let w = wallet();
    let challenge =
        "57896044618658097711785492504343953926634992332820282019728792003956564819968";
    let a = w.sign_challenge(challenge).unwrap();
    let b = w.sign_challenge(challenge).unwrap();
    // 64 bits of entropy; a collision here means the nonce source is broken.
    assert_ne!(a.path, b.path);
}

#[test]
fn message_signing_refuses_off_prefix_paths_and_bad_hashes() {
    let w = wallet();
    let hash = [0xabu8; 32];

    // Wrong hash lengths.
    assert_eq!(w.sign_message_hash(&[0u8; 31], &[MESSAGE_SIGNING_MAGIC, MESSAGE_BRANCH]), None);
    assert_eq!(w.sign_message_hash(&[0u8; 33], &[MESSAGE_SIGNING_MAGIC, MESSAGE_BRANCH]), None);
    assert_eq!(w.sign_message_hash(&[], &[MESSAGE_SIGNING_MAGIC, MESSAGE_BRANCH]), None);

    // Paths outside the reserved subtree.
    assert_eq!(w.sign_message_hash(&hash, &[]), None);
    assert_eq!(w.sign_message_hash(&hash, &[MESSAGE_SIGNING_MAGIC]), None);
    assert_eq!(w.sign_message_hash(&hash, &[MESSAGE_SIGNING_MAGIC, MESSAGE_BRANCH + 1]), None);
    assert_eq!(w.sign_message_hash(&hash, &[0, MESSAGE_BRANCH]), None);
    assert_eq!(w.sign_message_hash(&hash, &[3, 1, 7]), None);

    // The reserved prefix, with and without extra steps, signs.
    assert!(w.sign_message_hash(&hash, &[MESSAGE_SIGNING_MAGIC, MESSAGE_BRANCH]).is_some());
    assert!(w.sign_message_hash(&hash, &[MESSAGE_SIGNING_MAGIC, MESSAGE_BRANCH, 5]).is_some());
}

#[test]
fn message_signature_verifies_under_the_message_key() {
    let secp = Secp256k1::new();
    let w = wallet();
    let hash = [0x42u8; 32];
    let path = [MESSAGE_SIGNING_MAGIC, MESSAGE_BRANCH, 9];

    let der = w.sign_message_hash(&hash, &path).unwrap();
    let sig = ecdsa::Signature::from_der(&der).unwrap();

    let steps: DerivationPath = path.iter().map(|&i| ChildNumber::from(i)).collect();
    let key = ExtendedPrivKey::new_master(&SEED).unwrap().derive_priv(&secp, &steps);
    let pubkey = secp256k1::PublicKey::from_secret_key(&secp, &key.private_key);

    let digest = signed_msg_hash(&hex::encode(hash)).to_byte_array();
    secp.verify_ecdsa(&Message::from_digest(digest), &sig, &pubkey)
        .expect("message signature must verify under the message-subtree key");
}

#[test]
fn message_and_spending_subtrees_are_disjoint() {
    let secp = Secp256k1::new();
    let master = ExtendedPrivKey::new_master(&SEED).unwrap();

    // The message prefix starts with a plain step >= 2^16 while spending
    // paths start with either hardened(3) or a 16-bit branch index, so the
    // first step alone separates the subtrees. Spot-check the structural
    // argument anyway.
    let message_key = master.derive_priv(
        &secp,
        &[ChildNumber::from(MESSAGE_SIGNING_MAGIC), ChildNumber::from(MESSAGE_BRANCH)],
    );
    for (sub_account, branch, pointer) in [(0, 1, 7), (1, 1, 7), (2, 0, 0)] {
        let prev = spendable(ScriptType::P2sh, sub_account, branch, pointer);
        let spend_key = expected_input_key(&secp, &prev);
        assert_ne!(message_key.private_key, spend_key.private_key);
    }
}

#[test]
fn local_password_is_stable_per_root() {
    let w = wallet();
    assert_eq!(w.local_encryption_password(), w.local_encryption_password());

    let other = SigningWallet::from_seed(&[0x5a; 32], Network::Mainnet).unwrap();
    assert_ne!(w.local_encryption_password(), other.local_encryption_password());
}

#[test]
fn service_path_is_stable_per_root() {
    let w = wallet();
    assert_eq!(w.service_path(), w.service_path());

    let other = SigningWallet::from_seed(&[0x5a; 32], Network::Mainnet).unwrap();
    assert_ne!(w.service_path(), other.service_path());
}

#[test]
fn subaccount_public_keys_are_deterministic_and_distinct() {
    let w = wallet();
    let again = wallet();
    assert_eq!(w.sub_account_public_key(1).unwrap(), again.sub_account_public_key(1).unwrap());
    assert_ne!(w.sub_account_public_key(1).unwrap(), w.sub_account_public_key(2).unwrap());
}
