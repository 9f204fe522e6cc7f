use anyhow::Context;
use linktree_interface::{
    error::LinktreeProgramError,
    state::{MAX_LINKS, MAX_TITLE_LEN, MAX_URL_LEN},
};
use linktree_sdk::{LinktreeError, ProgramFailure};
use linktree_tests::TestRunner;
use solana_sdk::signature::Signer;

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn mismatched_lengths_are_rejected_by_the_program() {
    TestRunner::run(|ctx| async move {
        let owner = ctx.funded_keypair();
        let session = ctx.session(owner.clone());
        session.create_profile("alice").await.into_result()?;

        let outcome = session
            .add_links(
                "alice",
                strings(&["https://a.example", "https://b.example"]),
                strings(&["A"]),
            )
            .await;
        let err = outcome.error.context("mismatch should fail")?;
        assert_eq!(
            err.program_error(),
            Some(LinktreeProgramError::LengthInputsNotSame)
        );
        assert!(matches!(
            err,
            LinktreeError::ProgramRevert {
                index: 0,
                failure: ProgramFailure::Linktree(LinktreeProgramError::LengthInputsNotSame),
            }
        ));

        let record = session.my_profile("alice").await?.context("profile missing")?;
        assert!(record.links.is_empty());
        assert_eq!(record.link_counter, 0);
        Ok(())
    })
    .await;
}

#[tokio::test]
async fn empty_add_links_is_rejected_before_sending() {
    TestRunner::run(|ctx| async move {
        let owner = ctx.funded_keypair();
        let session = ctx.session(owner.clone());
        session.create_profile("alice").await.into_result()?;
        let sent = ctx.cluster.transactions_sent();

        let outcome = session.add_links("alice", vec![], vec![]).await;
        assert!(matches!(outcome.error, Some(LinktreeError::InvalidInput(_))));
        assert_eq!(ctx.cluster.transactions_sent(), sent);
        Ok(())
    })
    .await;
}

#[tokio::test]
async fn link_counter_grows_by_links_added_and_never_shrinks() {
    TestRunner::run(|ctx| async move {
        let owner = ctx.funded_keypair();
        let session = ctx.session(owner.clone());
        session.create_profile("alice").await.into_result()?;

        session
            .add_links(
                "alice",
                strings(&["https://a.example", "https://b.example", "https://c.example"]),
                strings(&["A", "B", "C"]),
            )
            .await
            .into_result()?;
        let record = session.my_profile("alice").await?.context("profile missing")?;
        assert_eq!(record.link_counter, 3);

        session.delete_links("alice", vec![1]).await.into_result()?;
        let record = session.my_profile("alice").await?.context("profile missing")?;
        assert_eq!(record.link_counter, 3);

        session
            .add_links(
                "alice",
                strings(&["https://d.example", "https://e.example"]),
                strings(&["D", "E"]),
            )
            .await
            .into_result()?;
        let record = session.my_profile("alice").await?.context("profile missing")?;
        assert_eq!(record.link_counter, 5);
        let ids: Vec<u64> = record.links.iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
        Ok(())
    })
    .await;
}

#[tokio::test]
async fn profile_account_has_room_for_a_bounded_number_of_links() {
    TestRunner::run(|ctx| async move {
        let owner = ctx.funded_keypair();
        let session = ctx.session(owner.clone());
        session.create_profile("alice").await.into_result()?;

        let title = "t".repeat(MAX_TITLE_LEN);
        let url = "u".repeat(MAX_URL_LEN);
        for _ in 0..MAX_LINKS {
            session
                .add_links("alice", vec![url.clone()], vec![title.clone()])
                .await
                .into_result()?;
        }

        let outcome = session.add_links("alice", vec![url], vec![title]).await;
        assert!(matches!(
            outcome.error,
            Some(LinktreeError::ProgramRevert {
                failure: ProgramFailure::Framework { code: 3004, .. },
                ..
            })
        ));

        let address = session.client().profile_pda("alice", &owner.pubkey())?;
        let record = ctx.cluster.profile(&address).context("profile missing")?;
        assert_eq!(record.link_counter, MAX_LINKS as u64);
        Ok(())
    })
    .await;
}
