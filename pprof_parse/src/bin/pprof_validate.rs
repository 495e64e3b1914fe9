use pprof_parse::Profile;
use std::env;
use std::fs::File;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();

    if args.len() != 2 {
        eprintln!("Usage: {} <profile.pprof>", args[0]);
        return ExitCode::from(2);
    }

    let path = &args[1];

    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error opening '{}': {}", path, e);
            return ExitCode::FAILURE;
        }
    };

    match Profile::parse(file) {
        Ok(profile) => {
            println!("Valid pprof profile: {}", path);
            for (idx, st) in profile.sample_types.iter().enumerate() {
                println!("  Sample type {}: {}/{}", idx, st.kind, st.unit);
            }
            if let Some(default) = &profile.default_sample_type {
                println!("  Default sample type: {}", default);
            }
            if let Some(period_type) = &profile.period_type {
                println!(
                    "  Period: {} {}/{}",
                    profile.period, period_type.kind, period_type.unit
                );
            }
            println!("  Samples: {}", profile.samples.len());
            println!("  Locations: {}", profile.locations.len());
            println!("  Functions: {}", profile.function_count);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Invalid pprof profile '{}': {}", path, e);
            ExitCode::FAILURE
        }
    }
}
