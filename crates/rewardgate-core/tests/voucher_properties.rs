use proptest::prelude::*;
use rewardgate_core::address::WalletAddress;
use rewardgate_core::voucher::{recover_signer, VoucherSigner};

const KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

// secp256k1 n / 2, big-endian
const HALF_ORDER: &str = "7fffffffffffffffffffffffffffffff5d576e7357a4501ddfe92f46681b20a0";

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn issued_vouchers_recover_and_are_canonical(
        recipient in any::<[u8; 20]>(),
        amount in any::<u128>(),
        nonce in any::<u64>(),
    ) {
        let signer = VoucherSigner::from_hex(KEY).expect("key");
        let voucher = signer
            .sign(WalletAddress::from_bytes(recipient), amount, nonce)
            .expect("sign");

        prop_assert_eq!(recover_signer(&voucher).expect("recover"), signer.address());
        prop_assert!(voucher.signature[64] == 27 || voucher.signature[64] == 28);

        let half = hex::decode(HALF_ORDER).expect("hex");
        prop_assert!(voucher.signature[32..64] <= half[..]);
    }
}

#[test]
fn different_recipient_does_not_recover_to_signer() {
    let signer = VoucherSigner::from_hex(KEY).expect("key");
    let mut voucher = signer
        .sign(WalletAddress::from_bytes([1; 20]), 5, 1_700_000_000_000)
        .expect("sign");
    voucher.recipient = WalletAddress::from_bytes([2; 20]);
    let recovered = recover_signer(&voucher).ok();
    assert_ne!(recovered, Some(signer.address()));
}
