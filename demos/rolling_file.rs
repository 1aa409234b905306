use tinted_log::{Logger, Options, Output, Rotation};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let options = Options::default()
        .with_output(Output::File)
        .with_filepath("logs")
        .with_filename_prefix("demo")
        .with_rotation(Rotation::Hourly)
        .with_max_files(24);
    let log = Logger::new(options)?;

    for i in 0..10 {
        log.info("tick", &["i".into(), i.into()])?;
    }
    log.flush()?;
    println!("wrote 10 lines under ./logs");
    Ok(())
}
