//! Distributed matrix multiplication over a [`Transport`].

use rank_transport::{PendingRequest, Rank, Tag, Transport};
use tracing::debug;

use crate::partition::{RowRange, plan};
use crate::{Error, Matrix};

/// The rank that holds the inputs and receives the full product.
pub const COORDINATOR: Rank = 0;

/// What a rank does during the communication phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Scatters A, roots the broadcast of B, gathers C.
    Coordinator,
    /// Receives its rows of A, sends back its rows of C.
    Worker,
}

impl Role {
    pub fn of(rank: Rank) -> Self {
        if rank == COORDINATOR {
            Role::Coordinator
        } else {
            Role::Worker
        }
    }
}

/// Slices travelling between the coordinator and a worker are tagged with
/// the worker's rank.
fn tag_for(rank: Rank) -> Tag {
    rank as Tag
}

/// Computes `C = A x B` across every rank of `transport`'s world.
///
/// Every rank must call this at the same time with matrices of identical
/// shapes. On entry only the coordinator's `a` and `b` need to hold the
/// inputs. On return the coordinator's `c` holds the full product; the
/// contents of `c` on other ranks are unspecified.
///
/// Rows of C are split over ranks with [`plan`]. The coordinator sends each
/// worker its rows of A without waiting, and every rank joins the broadcast
/// of B. A worker posts the receive for its rows of A before the broadcast
/// and waits on it afterwards. Each rank then computes its own rows, and the
/// workers send them back to the coordinator.
///
/// Shapes are validated before any communication. A transport failure is
/// fatal: it is returned immediately and leaves the other ranks in an
/// undefined state.
pub async fn multiply<T>(
    a: &mut Matrix,
    b: &mut Matrix,
    c: &mut Matrix,
    transport: &T,
) -> Result<(), Error>
where
    T: Transport + ?Sized,
{
    check_shapes(a, b, c)?;

    let rank = transport.rank();
    let role = Role::of(rank);

    if c.row_count() == 0 || c.col_count() == 0 {
        debug!(rank, "empty product, nothing to exchange");
        return Ok(());
    }
    if a.col_count() == 0 {
        debug!(rank, "empty inner dimension, product is zero");
        c.fill(0.0);
        return Ok(());
    }

    let owned = plan(c.row_count(), transport.size(), rank);
    debug!(rank, ?role, rows = ?owned.rows(), "starting multiply");

    let scattered = distribute(a, b, role, transport).await?;
    debug!(rank, "operands resident");

    compute_rows(a, b, c, owned);
    debug!(rank, rows = owned.len(), "local rows computed");

    collect(c, role, transport).await?;
    transport.wait_all(scattered, &mut []).await?;
    debug!(rank, "multiply complete");

    Ok(())
}

fn check_shapes(a: &Matrix, b: &Matrix, c: &Matrix) -> Result<(), Error> {
    if a.col_count() != b.row_count() {
        return Err(Error::DimensionMismatch(
            a.row_count(),
            a.col_count(),
            b.row_count(),
            b.col_count(),
        ));
    }
    if c.row_count() != a.row_count() || c.col_count() != b.col_count() {
        return Err(Error::OutputShape {
            rows: a.row_count(),
            cols: b.col_count(),
            actual_rows: c.row_count(),
            actual_cols: c.col_count(),
        });
    }
    Ok(())
}

/// Puts every worker's rows of A and all of B in place.
///
/// Returns the coordinator's outstanding A sends.
async fn distribute<T>(
    a: &mut Matrix,
    b: &mut Matrix,
    role: Role,
    transport: &T,
) -> Result<Vec<PendingRequest>, Error>
where
    T: Transport + ?Sized,
{
    let size = transport.size();
    let rows = a.row_count();
    let cols = a.col_count();

    match role {
        Role::Coordinator => {
            let mut sends = Vec::with_capacity(size.saturating_sub(1));
            for peer in 1..size {
                let slice = plan(rows, size, peer).elements(cols);
                sends.push(transport.isend(&a.values()[slice], peer, tag_for(peer))?);
            }
            transport.broadcast(b.values_mut(), COORDINATOR).await?;
            Ok(sends)
        }
        Role::Worker => {
            let rank = transport.rank();
            let slice = plan(rows, size, rank).elements(cols);
            let incoming = transport.irecv(slice, COORDINATOR, tag_for(rank))?;
            transport.broadcast(b.values_mut(), COORDINATOR).await?;
            transport.wait(incoming, a.values_mut()).await?;
            Ok(Vec::new())
        }
    }
}

/// Dense row-by-column product for the rows in `rows`, accumulated in
/// ascending `k`.
pub fn compute_rows(a: &Matrix, b: &Matrix, c: &mut Matrix, rows: RowRange) {
    for i in rows.rows() {
        for j in 0..c.col_count() {
            c.set(i, j, 0.0);
            for k in 0..b.row_count() {
                c.accumulate(i, j, a.get(i, k) * b.get(k, j));
            }
        }
    }
}

/// Brings every worker's rows of C back to the coordinator.
async fn collect<T>(c: &mut Matrix, role: Role, transport: &T) -> Result<(), Error>
where
    T: Transport + ?Sized,
{
    let size = transport.size();
    let rows = c.row_count();
    let cols = c.col_count();

    match role {
        Role::Coordinator => {
            let mut receives = Vec::with_capacity(size.saturating_sub(1));
            for peer in 1..size {
                let slice = plan(rows, size, peer).elements(cols);
                receives.push(transport.irecv(slice, peer, tag_for(peer))?);
            }
            transport.wait_all(receives, c.values_mut()).await?;
        }
        Role::Worker => {
            let rank = transport.rank();
            let slice = plan(rows, size, rank).elements(cols);
            transport
                .send(&c.values()[slice], COORDINATOR, tag_for(rank))
                .await?;
        }
    }

    Ok(())
}

/// Single-process reference product.
pub fn multiply_sequential(a: &Matrix, b: &Matrix) -> Result<Matrix, Error> {
    let mut c = Matrix::new(a.row_count(), b.col_count());
    check_shapes(a, b, &c)?;
    let all = RowRange {
        start: 0,
        end: a.row_count(),
    };
    compute_rows(a, b, &mut c, all);
    Ok(c)
}
