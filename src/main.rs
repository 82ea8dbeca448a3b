use alnseq::{align_process, args::AlnSeqArgs};
use clap::{Parser, error::ErrorKind};

fn main() {
    let args = match AlnSeqArgs::try_parse() {
        Ok(args) => args,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = err.print();
            std::process::exit(0);
        }
        Err(err) => {
            let _ = err.print();
            std::process::exit(1);
        }
    };

    if let Err(err) = align_process(args) {
        eprintln!("alnseq: {err}");
        std::process::exit(2);
    }
}
