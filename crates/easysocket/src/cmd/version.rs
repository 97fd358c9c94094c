use easysocket_frame::{HEADER_LEN, VERSION};

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<u8> {
    if !args.extended {
        println!("easysocket {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: easysocket");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!("protocol_version: {VERSION}");
    println!("header_len: {HEADER_LEN}");
    println!(
        "build_target: {}",
        option_env!("EASYSOCKET_BUILD_TARGET").unwrap_or("unknown")
    );
    println!(
        "build_profile: {}",
        option_env!("EASYSOCKET_BUILD_PROFILE").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("features: async={}, cli=true", cfg!(feature = "async"));

    Ok(SUCCESS)
}
