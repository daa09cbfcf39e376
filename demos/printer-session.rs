use std::error::Error;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use printer::block_entity::MissingItems;
use printer::connection::queued::{spawn_worker, LoopbackTransport};
use printer::connection::PlayerId;
use printer::render::AsciiCanvas;
use printer::screen::Axis;
use printer::{
    BlockPos, Channel, ClientConnection, Level, PrinterBlockEntity, PrinterConfig, PrinterScreen,
    PrinterView, SchematicCatalog, ScreenInput, WorkQueue,
};

#[tokio::main]
pub async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let args: Vec<_> = std::env::args().collect();
    let config = PrinterConfig::default();
    let dir = match args.get(1) {
        Some(dir) => Path::new(dir).to_owned(),
        None => config.schematics_path(Path::new(".")),
    };
    let catalog = SchematicCatalog::load(&dir, config.max_blocks);
    println!("{} schematics in {}", catalog.len(), dir.display());

    let channel = Arc::new(Channel::printer());
    let mut queue = WorkQueue::new(channel.clone(), config.work_queue_capacity);
    let (transport, packets) = LoopbackTransport::new(PlayerId(1));
    let worker = spawn_worker(packets, queue.sender());

    let printer_pos = BlockPos::new(0, 64, 0);
    let mut printer = PrinterBlockEntity::new(printer_pos, 100_000);
    printer.set_energy_stored(42_000);
    let mut level = Level::new();
    level.insert_printer(printer.clone());

    let connection = ClientConnection::connect(channel, transport, Channel::VERSION)?;
    let mut screen = PrinterScreen::new(
        config,
        connection,
        printer,
        catalog,
        BlockPos::new(3, 64, -2),
        (640, 300),
    );

    let now = Instant::now();
    let inputs = [
        ScreenInput::EditField {
            axis: Axis::X,
            value: "10".to_owned(),
        },
        ScreenInput::SelectSchematic(0),
        ScreenInput::CycleRotation,
        ScreenInput::Place,
    ];
    for input in inputs {
        screen.update(now, Some(input));
    }
    screen.update(now + Duration::from_secs(1), None);

    let mut missing = MissingItems::new();
    missing.insert("minecraft:stone_bricks".to_owned(), 64);
    missing.insert("minecraft:oak_planks".to_owned(), 12);
    screen.set_missing_items(missing);

    let mut canvas = AsciiCanvas::new(640, 300, 6, 10);
    let font = canvas.font();
    screen.render(&mut canvas, &font);
    println!("{canvas}");

    screen.update(now + Duration::from_secs(2), Some(ScreenInput::Close));
    drop(screen);
    worker.await?;

    let handled = level.drain(&mut queue);
    println!("Handled {handled} messages");
    if let Some(printer) = level.printer(&printer_pos) {
        println!(
            "target: {:?}, rotation: {:?}, schematic: {:?}",
            printer.stored_target(),
            printer.stored_rotation(),
            printer.stored_schematic()
        );
    }

    Ok(())
}
