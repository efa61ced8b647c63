use std::future::Future;
use std::io;
use std::thread;

use moco_core::register::CancelToken;
use tracing::{debug, warn};

/// Exit status for a second interrupt, as a shell reports SIGINT.
const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Cancel `token` on the first Ctrl-C; exit on the second.
///
/// After the first interrupt no new frames are dispatched, but frames already
/// handed to the engine finish and the workspace is still cleaned up.
pub fn cancel_on_ctrl_c(token: CancelToken) {
    let spawned = thread::Builder::new()
        .name("moco-interrupt".into())
        .spawn(move || {
            let rt = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    warn!(error = %e, "Ctrl-C handling unavailable");
                    return;
                }
            };
            rt.block_on(async {
                if cancel_when(tokio::signal::ctrl_c(), &token).await
                    && tokio::signal::ctrl_c().await.is_ok()
                {
                    std::process::exit(INTERRUPTED_EXIT_CODE);
                }
            });
        });
    if let Err(e) = spawned {
        debug!(error = %e, "Could not start interrupt listener");
    }
}

/// Wait for `interrupted`, then cancel. False if the listener itself failed.
async fn cancel_when<F>(interrupted: F, token: &CancelToken) -> bool
where
    F: Future<Output = io::Result<()>>,
{
    if let Err(e) = interrupted.await {
        warn!(error = %e, "Ctrl-C listener failed");
        return false;
    }
    eprintln!("Interrupted: finishing running frames, press Ctrl-C again to abort");
    token.cancel();
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block_on<F: Future>(f: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
            .block_on(f)
    }

    #[test]
    fn interrupt_cancels_token() {
        let token = CancelToken::new();
        assert!(block_on(cancel_when(async { Ok(()) }, &token)));
        assert!(token.is_cancelled());
    }

    #[test]
    fn failed_listener_leaves_token_alone() {
        let token = CancelToken::new();
        let failed = async { Err(io::Error::other("no signal driver")) };
        assert!(!block_on(cancel_when(failed, &token)));
        assert!(!token.is_cancelled());
    }
}
