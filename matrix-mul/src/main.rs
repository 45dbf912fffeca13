use clap::{Args, Parser, Subcommand, ValueEnum};
use matrix_mul::{COORDINATOR, Matrix, multiply, multiply_sequential, simulate};
use rank_transport::RemoteTransport;

const TOLERANCE: f64 = 1e-9;

#[derive(Parser)]
#[command(name = "matrix-mul")]
#[command(about = "Distributed row-partitioned matrix multiplication")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every rank inside this process.
    Simulate {
        /// Number of ranks.
        #[arg(long, default_value_t = 4)]
        ranks: usize,
        #[command(flatten)]
        shape: Shape,
    },
    /// Run one rank against a rank-hub.
    Rank {
        /// Hub address.
        #[arg(long, env = "MATRIX_MUL_HUB", default_value = "localhost:50051")]
        hub: String,
        /// This process's rank; rank 0 coordinates.
        #[arg(long, env = "MATRIX_MUL_RANK")]
        rank: usize,
        /// Number of ranks taking part.
        #[arg(long, env = "MATRIX_MUL_SIZE")]
        size: usize,
        #[command(flatten)]
        shape: Shape,
    },
}

#[derive(Args)]
struct Shape {
    /// Rows of A.
    m: usize,
    /// Columns of A, rows of B.
    n: usize,
    /// Columns of B.
    p: usize,
    /// How the coordinator fills the inputs.
    #[arg(long, value_enum, default_value_t = Fill::Sequential)]
    fill: Fill,
    /// Seed for random inputs.
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

#[derive(Clone, Copy, ValueEnum)]
enum Fill {
    Sequential,
    Random,
}

impl Shape {
    fn inputs(&self) -> (Matrix, Matrix) {
        match self.fill {
            Fill::Sequential => (
                Matrix::sequential(self.m, self.n),
                Matrix::sequential(self.n, self.p),
            ),
            Fill::Random => (
                Matrix::random(self.m, self.n, self.seed),
                Matrix::random(self.n, self.p, self.seed.wrapping_add(1)),
            ),
        }
    }
}

fn print_matrix(name: &str, matrix: &Matrix) {
    println!(
        "Matrix {} ({}x{}):",
        name,
        matrix.row_count(),
        matrix.col_count()
    );
    for row in matrix.to_rows() {
        println!("  {:?}", row);
    }
}

fn verify(a: &Matrix, b: &Matrix, c: &Matrix) -> Result<(), Box<dyn std::error::Error>> {
    let expected = multiply_sequential(a, b)?;
    if !c.approx_eq(&expected, TOLERANCE) {
        return Err("distributed product differs from the sequential product".into());
    }
    println!("Verified against the sequential product");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate { ranks, shape } => {
            let (a, b) = shape.inputs();
            print_matrix("A", &a);
            print_matrix("B", &b);

            let c = simulate(&a, &b, ranks).await?;
            print_matrix("C", &c);
            verify(&a, &b, &c)?;
        }
        Commands::Rank {
            hub,
            rank,
            size,
            shape,
        } => {
            let transport = RemoteTransport::connect(hub, rank, size).await?;

            let (mut a, mut b) = if rank == COORDINATOR {
                shape.inputs()
            } else {
                (
                    Matrix::new(shape.m, shape.n),
                    Matrix::new(shape.n, shape.p),
                )
            };
            let mut c = Matrix::new(shape.m, shape.p);

            multiply(&mut a, &mut b, &mut c, &transport).await?;

            // the coordinator's inputs are left untouched by the multiply
            if rank == COORDINATOR {
                print_matrix("C", &c);
                verify(&a, &b, &c)?;
            } else {
                println!("Rank {} done", rank);
            }
        }
    }

    Ok(())
}
