//! Session files on a FAT-formatted SD card over SPI.  Raw handles are used
//! so the open file can be owned by the session controller between cycles.

use embassy_stm32::gpio::Output;
use embassy_stm32::mode::Blocking;
use embassy_stm32::spi::Spi;
use embassy_time::Delay;
use embedded_hal_bus::spi::ExclusiveDevice;
use embedded_sdmmc::{
    Mode, RawDirectory, RawFile, SdCard, SdCardError, TimeSource, Timestamp, VolumeIdx, VolumeManager,
};

use business_logic::ports::LogStorage;
use crate::fmt::{info, warn};

pub type SdSpi = ExclusiveDevice<Spi<'static, Blocking>, Output<'static>, Delay>;
pub type SdBlockDevice = SdCard<SdSpi, Delay>;

const LINE_TERMINATOR: &[u8] = b"\r\n";

#[derive(Debug)]
pub enum StorageError {
    NotMounted,
    Card(embedded_sdmmc::Error<SdCardError>),
}

impl From<embedded_sdmmc::Error<SdCardError>> for StorageError {
    fn from(err: embedded_sdmmc::Error<SdCardError>) -> Self {
        StorageError::Card(err)
    }
}

/// File timestamps are not used; names carry the session start.
pub struct FixedTimeSource;

impl TimeSource for FixedTimeSource {
    fn get_timestamp(&self) -> Timestamp {
        Timestamp {
            year_since_1970: 55,
            zero_indexed_month: 0,
            zero_indexed_day: 0,
            hours: 0,
            minutes: 0,
            seconds: 0,
        }
    }
}

pub struct SdStorage {
    volume_mgr: VolumeManager<SdBlockDevice, FixedTimeSource>,
    root: Option<RawDirectory>, // Root directory of the first partition, once mounted.
}

impl SdStorage {
    pub fn new(card: SdBlockDevice) -> Self {
        Self {
            volume_mgr: VolumeManager::new(card, FixedTimeSource),
            root: None,
        }
    }
}

impl LogStorage for SdStorage {
    type Handle = RawFile;
    type Error = StorageError;

    fn initialize(&mut self) -> Result<(), StorageError> {
        let volume = self.volume_mgr.open_raw_volume(VolumeIdx(0)).inspect_err(|_| warn!("No SD card volume"))?;
        self.root = Some(self.volume_mgr.open_root_dir(volume)?);
        info!("SD card mounted");
        Ok(())
    }

    fn open(&mut self, name: &str) -> Result<RawFile, StorageError> {
        let root = self.root.ok_or(StorageError::NotMounted)?;
        Ok(self.volume_mgr.open_file_in_dir(root, name, Mode::ReadWriteCreateOrAppend)?)
    }

    fn append(&mut self, handle: &mut RawFile, line: &str) -> Result<(), StorageError> {
        self.volume_mgr.write(*handle, line.as_bytes())?;
        self.volume_mgr.write(*handle, LINE_TERMINATOR)?;
        // Write back the directory entry so the file length survives a power
        // loss mid-session.
        self.volume_mgr.flush_file(*handle)?;
        Ok(())
    }

    fn close(&mut self, handle: RawFile) -> Result<(), StorageError> {
        // Closing writes back the directory entry and any buffered data.
        Ok(self.volume_mgr.close_file(handle)?)
    }
}
