//! `matmul-bench`: times the selected kernels on one random `n × n` problem.
//!
//! ```text
//! matmul-bench [-a keys] [-s seed] [-t threshold] [-h] [n]
//! ```
//!
//! Log output goes through `env_logger`; set `RUST_LOG=debug` to see which
//! vector backend and recursion depth were chosen. `RAYON_NUM_THREADS`
//! bounds the parallel kernels.

use std::process::ExitCode;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::SeedableRng;

use matmul_kernels::error::{validation_error, Result};
use matmul_kernels::kernels::{self, Kernel};
use matmul_kernels::utils::{checksum, fill_random, gflops, AlignedVec};
use matmul_kernels::{dac, simd, DAC_THRESHOLD};

const DEFAULT_N: usize = 4096;
const DEFAULT_SEED: u64 = 1;

#[derive(Debug, Clone, PartialEq)]
struct Options {
    n: usize,
    keys: String,
    seed: u64,
    threshold: usize,
    help: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            n: DEFAULT_N,
            keys: kernels::all().iter().map(|k| k.key).collect(),
            seed: DEFAULT_SEED,
            threshold: DAC_THRESHOLD,
            help: false,
        }
    }
}

fn parse_number<T: std::str::FromStr>(flag: &str, value: Option<String>) -> Result<T> {
    let value = value.ok_or_else(|| validation_error(format!("{} expects a value", flag)))?;
    value
        .parse()
        .map_err(|_| validation_error(format!("{}: '{}' is not a valid number", flag, value)))
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<Options> {
    let mut opts = Options::default();
    let mut args = args.into_iter();
    let mut size_seen = false;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-a" => {
                opts.keys = args
                    .next()
                    .ok_or_else(|| validation_error("-a expects a list of kernel keys"))?;
            }
            "-s" => opts.seed = parse_number("-s", args.next())?,
            "-t" => {
                opts.threshold = parse_number("-t", args.next())?;
                if opts.threshold == 0 {
                    return Err(validation_error("-t: threshold must be at least 1"));
                }
            }
            "-h" | "--help" => opts.help = true,
            flag if flag.starts_with('-') => {
                return Err(validation_error(format!("unknown option '{}'", flag)));
            }
            _ if size_seen => {
                return Err(validation_error(format!("unexpected argument '{}'", arg)));
            }
            _ => {
                opts.n = parse_number("n", Some(arg))?;
                size_seen = true;
            }
        }
    }
    Ok(opts)
}

fn usage() -> String {
    let mut text = format!(
        "usage: matmul-bench [-a keys] [-s seed] [-t threshold] [-h] [n]\n\n\
         \x20 n             matrix side (default {})\n\
         \x20 -a keys       kernels to run, e.g. -a bcik (default: all)\n\
         \x20 -s seed       seed for the random inputs (default {})\n\
         \x20 -t threshold  divide-and-conquer base-case side (default {})\n\
         \x20 -h            print this help and exit with status 0\n\n\
         kernels:\n",
        DEFAULT_N, DEFAULT_SEED, DAC_THRESHOLD
    );
    for k in kernels::all() {
        text.push_str(&format!("  {}  {}\n", k.key, k.name));
    }
    text
}

/// Precondition check, with the run-time threshold for divide-and-conquer.
fn check_kernel(kernel: &Kernel, n: usize, threshold: usize) -> Result<()> {
    if kernel.is_divide_and_conquer() {
        dac::check_size(n, threshold)
    } else {
        kernel.check(n)
    }
}

fn run(opts: &Options) -> Result<()> {
    let selected = kernels::select(&opts.keys)?;
    let n = opts.n;

    let mut p = AlignedVec::square(n)?;
    let mut q = AlignedVec::square(n)?;
    let mut r = AlignedVec::square(n)?;

    let mut rng = StdRng::seed_from_u64(opts.seed);
    fill_random(&mut p, &mut rng);
    fill_random(&mut q, &mut rng);

    println!("matrix size: {} x {}", n, n);
    println!("threads:     {}", rayon::current_num_threads());
    println!("vector unit: {}", simd::matmul::vector_backend());
    println!("alignment:   {} bytes", p.alignment());
    println!();
    println!("{:<3} {:<34} {:>10} {:>10} {:>18}", "key", "kernel", "seconds", "GFLOPS", "checksum");

    for kernel in selected {
        if let Err(e) = check_kernel(kernel, n, opts.threshold) {
            log::warn!("skipping '{}' ({}): {}", kernel.key, kernel.name, e);
            continue;
        }

        let start = Instant::now();
        if kernel.is_divide_and_conquer() {
            dac::matmul_dac_with_threshold(&p, &q, &mut r, n, opts.threshold);
        } else {
            kernel.run(&p, &q, &mut r, n);
        }
        let seconds = start.elapsed().as_secs_f64();

        println!(
            "{:<3} {:<34} {:>10.4} {:>10.3} {:>18.6e}",
            kernel.key,
            kernel.name,
            seconds,
            gflops(n, seconds),
            checksum(&r)
        );
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();

    let opts = match parse_args(std::env::args().skip(1)) {
        Ok(opts) => opts,
        Err(e) => {
            eprintln!("matmul-bench: {}", e);
            eprint!("{}", usage());
            return ExitCode::FAILURE;
        }
    };

    if opts.help {
        print!("{}", usage());
        return ExitCode::SUCCESS;
    }

    match run(&opts) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("matmul-bench: {}", e);
            ExitCode::FAILURE
        }
    }
}
