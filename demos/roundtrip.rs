use std::{env, fs};

use stream_deflate::{Level, Pump, PumpConfig, Session};

fn main() {
    let path = env::args().nth(1).unwrap_or_else(|| "Cargo.toml".to_owned());
    let data = fs::read(&path).unwrap();

    let mut compressed = Vec::new();
    {
        let mut pump = Pump::new(Session::compressor(Level::BestCompression).unwrap(), PumpConfig { chunk_size: 4096 }).unwrap();
        pump.set_callback(|chunk| {
            println!("Compressed chunk of {} bytes", chunk.len());
            compressed.extend_from_slice(chunk);
            Ok(())
        });

        for piece in data.chunks(1000) {
            pump.update(piece).unwrap();
        }
        pump.finish().unwrap();
        pump.into_session().end().unwrap();
    }

    let mut restored = vec![0; data.len()];
    let written = stream_deflate::decompress_one_shot(&mut restored, &compressed).unwrap();

    println!("{path}: {} -> {} bytes", data.len(), compressed.len());
    println!("Checksum {:08x}, restored {written} bytes, match: {}", stream_deflate::crc32(0, &data), restored == data);

    let version = stream_deflate::engine_version();
    if !version.is_empty() {
        println!("Linked against zlib {version}");
    }
}
