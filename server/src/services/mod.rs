pub mod tile_watcher;
