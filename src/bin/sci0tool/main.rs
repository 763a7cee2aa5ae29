mod render;

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use sci0_decode::scigfx::font::{Font, FontOptions};
use sci0_decode::scigfx::picture::{self, Picture, SCREEN_HEIGHT, SCREEN_WIDTH};
use sci0_decode::scigfx::view0::{View0, ViewOptions};
use sci0_decode::scires::resource::{CompressionMethod, ResourceType};
use sci0_decode::scires::resource0::ResourceDirectory;
use sci0_decode::scires::text::Text;
use sci0_decode::scisound::sound0::Sound0;

#[derive(Clone, Copy, ValueEnum)]
enum Layout {
    /// Layout as commonly documented
    Documented,
    /// Layout as read by the SCI0 interpreter
    Interpreter,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Lists all resources
    List,
    /// Extract decompressed resources
    Extract {
        /// Output directory
        out_dir: PathBuf,
    },
    /// Compression and picture opcode statistics
    Stats,
    /// Renders the visual, priority and control planes of a picture
    Pic {
        /// Picture to draw
        num: u16,
    },
    /// Renders every image of a view
    View {
        /// View to draw
        num: u16,
    },
    /// Renders a font sheet
    Font {
        /// Font to draw
        num: u16,
    },
    /// Prints the event stream of a sound
    Sound {
        /// Sound to decode
        num: u16,
    },
    /// Prints the strings of a text resource
    Text {
        /// Text to print
        num: u16,
    },
}

/// Decodes SCI0 resources from RESOURCE.MAP / RESOURCE.*
#[derive(Parser)]
struct Cli {
    #[command(flatten)]
    verbose: clap_verbosity_flag::Verbosity,
    /// View and font layout variant
    #[clap(long, value_enum, default_value_t = Layout::Documented)]
    layout: Layout,
    /// Where rendered bitmaps are written
    #[clap(long, default_value = ".")]
    bmp_dir: PathBuf,
    /// Input directory
    in_dir: PathBuf,
    #[command(subcommand)]
    command: CliCommand,
}

fn list(directory: &ResourceDirectory) -> Result<()> {
    println!("resource      compr uncompr method");
    for handle in directory.entries() {
        let id = handle.id();
        match handle.read_block() {
            Ok(block) => {
                println!("{:12} {:6}  {:6} {}", id.to_string(), block.compressed_size, block.decompressed_size, block.method);
            }
            Err(e) => println!("{:12} !! {}", id.to_string(), e),
        }
    }
    Ok(())
}

fn extract(out_dir: &Path, directory: &ResourceDirectory) -> Result<()> {
    std::fs::create_dir_all(out_dir).with_context(|| format!("cannot create {}", out_dir.display()))?;
    let mut failed = 0;
    for handle in directory.entries() {
        let id = handle.id();
        match handle.ensure_loaded() {
            Ok(resource) => {
                println!("  {}: {} -> {} bytes ({})", id, resource.compressed_size, resource.data.len(), resource.method);
                let mut r_file = File::create(out_dir.join(id.to_string()))?;
                r_file.write_all(&resource.data)?;
            }
            Err(e) => {
                println!("  {}: !! could not decompress, skipping: {}", id, e);
                failed += 1;
            }
        }
    }
    println!("{} resources, {} failed", directory.len(), failed);
    Ok(())
}

fn method_column(method: CompressionMethod) -> usize {
    match method {
        CompressionMethod::None => 0,
        CompressionMethod::LZW => 1,
        CompressionMethod::Huffman => 2,
    }
}

fn stats(directory: &ResourceDirectory) -> Result<()> {
    let mut methods: BTreeMap<ResourceType, [usize; 4]> = BTreeMap::new();
    for handle in directory.entries() {
        let column = match handle.read_block() {
            Ok(block) => method_column(block.method),
            Err(e) => {
                log::warn!("{}: {}", handle.id(), e);
                3
            }
        };
        methods.entry(handle.id().rtype).or_insert([0; 4])[column] += 1;
    }

    println!("type          none    lzw huffman  error");
    for (rtype, counts) in &methods {
        println!("{:10} {:7} {:6} {:7} {:6}", rtype.to_string(), counts[0], counts[1], counts[2], counts[3]);
    }

    let (mut pictures, mut broken, mut unknown, mut total) = (0, 0, 0, 0);
    for handle in directory.entries_of_type(ResourceType::Picture) {
        pictures += 1;
        match handle.ensure_loaded().and_then(|resource| picture::audit(&resource.data)) {
            Ok(stats) => {
                unknown += stats.unknown;
                total += stats.total;
            }
            Err(e) => {
                log::warn!("{}: {}", handle.id(), e);
                broken += 1;
            }
        }
    }
    println!("pictures: {} ({} failed), opcodes: {} ({} unknown)", pictures, broken, total, unknown);
    Ok(())
}

fn draw_pic(directory: &ResourceDirectory, num: u16, bmp_dir: &Path) -> Result<()> {
    let resource = directory.get(ResourceType::Picture, num)?;
    let pic = Picture::decode(&resource.data)?;
    if pic.stats.unknown != 0 {
        println!("{}: {} of {} opcodes unknown", resource.id, pic.stats.unknown, pic.stats.total);
    }

    let palette = render::ega_palette();
    let width = SCREEN_WIDTH as u32;
    let height = SCREEN_HEIGHT as u32;
    for (name, plane) in [("visual", &pic.planes.visual), ("priority", &pic.planes.priority), ("control", &pic.planes.control)] {
        let path = bmp_dir.join(format!("{}.{}.bmp", resource.id, name));
        render::render_bitmap(&path, width, height, plane, &palette)?;
    }
    Ok(())
}

fn draw_view(directory: &ResourceDirectory, num: u16, options: &ViewOptions, bmp_dir: &Path) -> Result<()> {
    let resource = directory.get(ResourceType::View, num)?;
    let view = View0::new(&resource.data, options)?;
    for (cell_nr, cell) in view.cells.iter().enumerate() {
        let mirrored = if view.is_mirrored(cell_nr) { " (mirrored)" } else { "" };
        println!("cell {}: bytes {:?}, {} images{}", cell_nr, cell.span, cell.image_cells.len(), mirrored);
        for (image_nr, image) in cell.image_cells.iter().enumerate() {
            let path = bmp_dir.join(format!("{}.{}.{}.bmp", resource.id, cell_nr, image_nr));
            render::render_image_cell(&path, image)?;
        }
    }
    Ok(())
}

fn draw_font(directory: &ResourceDirectory, num: u16, options: &FontOptions, bmp_dir: &Path) -> Result<()> {
    let resource = directory.get(ResourceType::Font, num)?;
    let font = Font::new(&resource.data, options)?;
    println!("{}: {} characters, height {}", resource.id, font.get_number_of_chars(), font.get_height());
    render::render_font(&bmp_dir.join(format!("{}.bmp", resource.id)), &font)
}

fn print_sound(directory: &ResourceDirectory, num: u16) -> Result<()> {
    let resource = directory.get(ResourceType::Sound, num)?;
    let sound = Sound0::new(&resource.data)?;
    println!("digital sample: {}", sound.is_digital_sample());
    for (channel, init) in sound.channel_init.iter().enumerate() {
        println!("  channel {:2}: {:02x} {:02x}", channel, init[0], init[1]);
    }
    for event in &sound.events {
        println!("{:6} ch{:<2} {:12} {:02x?}", event.delta, event.channel, event.kind.name(), event.data);
    }
    println!("{} events, {} ticks", sound.events.len(), sound.total_ticks());
    Ok(())
}

fn print_text(directory: &ResourceDirectory, num: u16) -> Result<()> {
    let resource = directory.get(ResourceType::Text, num)?;
    let text = Text::new(&resource.data);
    for (n, item) in text.iter().enumerate() {
        println!("{:3}: {}", n, String::from_utf8_lossy(item));
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Cli::parse();
    env_logger::Builder::new()
        .filter_level(args.verbose.log_level_filter())
        .init();

    let directory = ResourceDirectory::open(&args.in_dir)
        .with_context(|| format!("unable to open SCI0 resources in {}", args.in_dir.display()))?;
    let (view_options, font_options) = match args.layout {
        Layout::Documented => (ViewOptions::default(), FontOptions::default()),
        Layout::Interpreter => (ViewOptions::sci0_interpreter(), FontOptions::sci0_interpreter()),
    };

    match &args.command {
        CliCommand::List => list(&directory),
        CliCommand::Extract { out_dir } => extract(out_dir, &directory),
        CliCommand::Stats => stats(&directory),
        CliCommand::Pic { num } => draw_pic(&directory, *num, &args.bmp_dir),
        CliCommand::View { num } => draw_view(&directory, *num, &view_options, &args.bmp_dir),
        CliCommand::Font { num } => draw_font(&directory, *num, &font_options, &args.bmp_dir),
        CliCommand::Sound { num } => print_sound(&directory, *num),
        CliCommand::Text { num } => print_text(&directory, *num),
    }
}
