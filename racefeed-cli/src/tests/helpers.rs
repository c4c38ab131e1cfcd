//! Test helpers shared by the CLI unit and behaviour tests.

use racefeed_core::AthleteRecord;

/// Credentials accepted by every remote command.
pub(super) const LOGIN: &str = "timer";
pub(super) const PASSWORD: &str = "secret";
pub(super) const CLIENT_ID: &str = "client";
pub(super) const EVENT_ID: &str = "42";

pub(super) fn athletes(count: u64) -> Vec<AthleteRecord> {
    (1..=count)
        .map(|n| {
            AthleteRecord::new(
                n.to_string(),
                "Runner",
                format!("No{n}"),
                "0:41:07.3",
                "0:41:12",
            )
        })
        .collect()
}

pub(super) fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("build runtime")
        .block_on(future)
}

/// Captured command output as text.
pub(super) fn text(out: Vec<u8>) -> String {
    String::from_utf8(out).expect("utf-8 output")
}
