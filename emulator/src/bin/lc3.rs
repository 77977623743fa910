use emu_lib::Emulator;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::error;


/// LC-3 Emulator
#[derive(Parser)]
#[command(about)]
struct Args {
    /// Images to load, in order. Execution starts at 0x3000.
    #[arg(required = true)]
    images: Vec<PathBuf>,
}


fn main() -> ExitCode {
    env_logger::init();

    let opt = Args::parse();

    let mut emu = Emulator::new();
    for image in &opt.images {
        if let Err(e) = emu.load_image_file(image) {
            error!("{e}");
            eprintln!("failed to load image: {}", image.display());
            return ExitCode::from(1);
        }
    }

    if let Err(e) = emu.run() {
        eprintln!("{e}");
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}
