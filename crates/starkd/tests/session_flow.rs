//! End-to-end browser flow against the in-memory wallet

use starkd::mock::MockWallet;
use starkd::prelude::*;
use starkd::AddTransactionResponse;
use std::time::Duration;
use tokio::sync::mpsc;

fn contracts() -> ContractSet {
    ContractSet {
        multi_token: ContractRef::parse("0x1155").unwrap(),
        single_token: ContractRef::parse("0x721").unwrap(),
        fungible_token: ContractRef::parse("0x20").unwrap(),
    }
}

#[tokio::test]
async fn connect_call_and_disconnect() {
    let wallet = MockWallet::new("0xa11ce");
    wallet
        .mock_signer()
        .push_response(AddTransactionResponse::received("0xabc"));
    wallet.mock_provider().push_result(["100"]);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut session = WalletSession::new();
    let mut subscription = session
        .connect(&wallet, move |account| {
            let _ = tx.send(account);
        })
        .await
        .unwrap();

    let client = SessionClient::new(contracts());

    let mut hash = None;
    client
        .invoke_transfer_with(&session, "0xa11ce", "3", "1", |h| hash = Some(h))
        .await
        .unwrap();
    assert_eq!(hash, Some(TxHash::from("0xabc")));

    let mut balance = None;
    client
        .read_balance_with(&session, "0x1", |b| balance = Some(b))
        .await
        .unwrap();
    assert_eq!(balance.as_deref(), Some("100"));

    wallet.change_accounts(vec!["0xb0b".into()]);
    let changed = tokio::time::timeout(Duration::from_secs(1), rx.recv()).await.unwrap();
    assert_eq!(changed.as_deref(), Some("0xb0b"));

    subscription.cancel();
    session.disconnect();
    session.disconnect();
    assert!(!session.is_connected());

    let after = client.read_balance(&session, "0x1").await;
    assert!(matches!(after, Err(StarknetError::NotConnected)));
}

#[tokio::test]
async fn sessions_are_independent() {
    let first = MockWallet::new("0x1");
    let second = MockWallet::new("0x2");

    let mut a = WalletSession::new();
    let mut b = WalletSession::new();
    let _sa = a.connect(&first, |_| {}).await.unwrap();
    let _sb = b.connect(&second, |_| {}).await.unwrap();

    a.disconnect();
    assert!(!a.is_connected());
    assert_eq!(b.account(), Some("0x2"));
}
