// Test helpers shared by the scheduler tests and the crawler tests.

use std::time::Duration;

/// Fails the test unless every spawned task on the current runtime has
/// finished. A task that just completed can still be counted for a moment,
/// so this polls for a while before giving up.
pub(crate) async fn assert_no_alive_tasks() {
    let metrics = tokio::runtime::Handle::current().metrics();

    for _ in 0..100 {
        if metrics.num_alive_tasks() == 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    panic!("{} task(s) still alive", metrics.num_alive_tasks());
}
