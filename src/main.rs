use clap::{Arg, ArgAction, Command};
use log::{info, warn};
use minifb::{Key, Window, WindowOptions};

use ferrum::gb::GameBoy;
use ferrum::joypad::Button;
use ferrum::ppu::{SCREEN_HEIGHT, SCREEN_WIDTH};

/// Conventional four-shade DMG palette, lightest to darkest, packed
/// as 0x00RRGGBB for minifb's window buffer.
const PALETTE: [u32; 4] = [0x00E0_F8D0, 0x0088_C070, 0x0034_6856, 0x0008_1820];

fn shade_to_rgb(buffer: &[u8], out: &mut [u32]) {
    for (pixel, &shade) in out.iter_mut().zip(buffer.iter()) {
        *pixel = PALETTE[shade as usize & 0x03];
    }
}

fn read_boot_rom(path: &str) -> Option<[u8; ferrum::boot::BOOT_ROM_SIZE]> {
    match std::fs::read(path) {
        Ok(bytes) if bytes.len() == ferrum::boot::BOOT_ROM_SIZE => {
            let mut image = [0u8; ferrum::boot::BOOT_ROM_SIZE];
            image.copy_from_slice(&bytes);
            Some(image)
        }
        Ok(bytes) => {
            warn!(
                "boot ROM at {path} is {} bytes, expected {}; ignoring",
                bytes.len(),
                ferrum::boot::BOOT_ROM_SIZE
            );
            None
        }
        Err(e) => {
            warn!("failed to read boot ROM at {path}: {e}");
            None
        }
    }
}

fn main() {
    env_logger::init();

    let matches = Command::new("ferrum")
        .version("0.1.0")
        .author("m0x <https://github.com/m0xsec/ferrum>")
        .about("A Gameboy emulator written in Rust.")
        .arg(
            Arg::new("testing")
                .short('t')
                .long("testing")
                .help("Enables testing mode (verbose register dumps).")
                .action(ArgAction::SetTrue)
                .default_value("false"),
        )
        .arg(
            Arg::new("rom")
                .short('r')
                .long("rom")
                .value_name("FILE")
                .help("Sets the ROM file to load.")
                .required(true),
        )
        .arg(
            Arg::new("boot-rom")
                .long("boot-rom")
                .value_name("FILE")
                .help("Optional 256-byte DMG boot ROM image to overlay at startup."),
        )
        .arg(
            Arg::new("scale")
                .long("scale")
                .value_name("N")
                .help("Integer window scale factor.")
                .default_value("3"),
        )
        .arg_required_else_help(true)
        .get_matches();

    let testing = matches.get_flag("testing");
    let rom_path = matches.get_one::<String>("rom").unwrap();
    let scale: usize = matches
        .get_one::<String>("scale")
        .unwrap()
        .parse()
        .unwrap_or(3);

    if testing {
        warn!("Testing mode enabled: register state will be logged every frame.");
    }

    let boot_rom = matches
        .get_one::<String>("boot-rom")
        .and_then(|path| read_boot_rom(path));

    let rom = std::fs::read(rom_path).unwrap_or_else(|e| {
        eprintln!("failed to read ROM {rom_path}: {e}");
        std::process::exit(1);
    });

    let mut gb = GameBoy::power_on(boot_rom);
    if let Err(e) = gb.load_rom(rom) {
        eprintln!("failed to load ROM {rom_path}: {e}");
        std::process::exit(1);
    }

    println!("\nCartridge Info:");
    println!("\tTitle: {}", gb.cartridge_title());

    let mut window = Window::new(
        "ferrum",
        SCREEN_WIDTH * scale,
        SCREEN_HEIGHT * scale,
        WindowOptions::default(),
    )
    .unwrap_or_else(|e| {
        eprintln!("failed to open window: {e}");
        std::process::exit(1);
    });

    let mut scaled = vec![0u32; SCREEN_WIDTH * scale * SCREEN_HEIGHT * scale];
    let mut small = vec![0u32; SCREEN_WIDTH * SCREEN_HEIGHT];

    info!("starting emulation loop");
    while window.is_open() && !window.is_key_down(Key::Escape) {
        gb.set_button(Button::A, window.is_key_down(Key::Z));
        gb.set_button(Button::B, window.is_key_down(Key::X));
        gb.set_button(Button::Start, window.is_key_down(Key::Enter));
        gb.set_button(Button::Select, window.is_key_down(Key::Backspace));
        gb.set_button(Button::Up, window.is_key_down(Key::Up));
        gb.set_button(Button::Down, window.is_key_down(Key::Down));
        gb.set_button(Button::Left, window.is_key_down(Key::Left));
        gb.set_button(Button::Right, window.is_key_down(Key::Right));

        gb.run_frame();
        shade_to_rgb(gb.frame_buffer(), &mut small);

        for y in 0..SCREEN_HEIGHT * scale {
            for x in 0..SCREEN_WIDTH * scale {
                scaled[y * SCREEN_WIDTH * scale + x] = small[(y / scale) * SCREEN_WIDTH + (x / scale)];
            }
        }

        window
            .update_with_buffer(&scaled, SCREEN_WIDTH * scale, SCREEN_HEIGHT * scale)
            .unwrap();
    }
}
