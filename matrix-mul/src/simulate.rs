//! Runs a whole world of ranks inside one process.

use rank_transport::{LocalTransport, Transport};
use tokio::task::JoinSet;
use tracing::info;

use crate::matrix_mul::{COORDINATOR, multiply};
use crate::{Error, Matrix};

/// Multiplies `a` by `b` with `ranks` in-process ranks and returns the
/// coordinator's product.
///
/// Each rank runs on its own task. Only the coordinator starts with the
/// inputs; the other ranks start from zeroed matrices of the same shapes.
pub async fn simulate(a: &Matrix, b: &Matrix, ranks: usize) -> Result<Matrix, Error> {
    if ranks == 0 {
        return Err(Error::EmptyWorld);
    }
    info!(
        ranks,
        m = a.row_count(),
        n = a.col_count(),
        p = b.col_count(),
        "simulating distributed multiply"
    );

    let mut tasks = JoinSet::new();
    for transport in LocalTransport::world(ranks) {
        let rank = transport.rank();
        let (mut a, mut b) = if rank == COORDINATOR {
            (a.clone(), b.clone())
        } else {
            (
                Matrix::new(a.row_count(), a.col_count()),
                Matrix::new(b.row_count(), b.col_count()),
            )
        };
        let mut c = Matrix::new(a.row_count(), b.col_count());

        tasks.spawn(async move {
            let outcome = multiply(&mut a, &mut b, &mut c, &transport).await;
            (rank, outcome.map(|()| c))
        });
    }

    let mut product = None;
    while let Some(joined) = tasks.join_next().await {
        let (rank, outcome) = joined?;
        // an error here drops the set, which aborts the remaining ranks
        let c = outcome?;
        if rank == COORDINATOR {
            product = Some(c);
        }
    }

    product.ok_or(Error::EmptyWorld)
}
