fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let command = match quiz_snap::Command::parse(&args) {
        Ok(command) => command,
        Err(message) => {
            eprintln!("{message}");
            std::process::exit(2);
        }
    };

    if let Err(e) = quiz_snap::run(command) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
