use std::{
    env,
    fs::File,
    io::{self, prelude::*},
    path::PathBuf,
};

fn main() -> Result<(), Error> {
    let target = Target::read();

    copy_memory_config(target)?;

    println!("cargo:rerun-if-changed=build.rs");

    Ok(())
}

/// Make `memory.x` available to dependent crates
fn copy_memory_config(target: Target) -> Result<(), Error> {
    let memory_x = match target.sub_family {
        SubFamily::Stm32f072 => include_bytes!("memory_128_16.x").as_ref(),
    };

    let out_dir = env::var("OUT_DIR")?;
    let out_dir = PathBuf::from(out_dir);

    File::create(out_dir.join("memory.x"))?.write_all(memory_x)?;

    // Tell Cargo where to find the file.
    println!("cargo:rustc-link-search={}", out_dir.display());

    println!("cargo:rerun-if-changed=memory_128_16.x");

    Ok(())
}

#[derive(Clone, Copy)]
struct Target {
    sub_family: SubFamily,
}

impl Target {
    fn read() -> Self {
        let sub_family = SubFamily::read();

        Self { sub_family }
    }
}

#[derive(Clone, Copy)]
enum SubFamily {
    Stm32f072,
}

impl SubFamily {
    fn read() -> Self {
        if cfg!(feature = "stm32f072") {
            SubFamily::Stm32f072
        } else {
            error("You must select a target.
If you added stm32f0xx-pwm as a dependency to your crate, you can select a target by enabling the respective feature in `Cargo.toml`.
If you're running the demo from the repository, select a target by passing the desired target as a command-line argument, for example `--features=stm32f072`.
Please refer to the documentation for more details."
                )
        }
    }
}

#[derive(Debug)]
enum Error {
    Env(env::VarError),
    Io(io::Error),
}

impl From<env::VarError> for Error {
    fn from(error: env::VarError) -> Self {
        Self::Env(error)
    }
}

impl From<io::Error> for Error {
    fn from(error: io::Error) -> Self {
        Self::Io(error)
    }
}

fn error(message: &str) -> ! {
    panic!("\n\n\n{}\n\n\n", message);
}
