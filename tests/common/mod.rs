//! Test doubles for the Telegram transport, the pack store and background removal

#![allow(dead_code)]

use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use image::{ImageOutputFormat, Rgba, RgbaImage};
use teloxide::types::{ChatId, FileId, InlineKeyboardButtonKind, InlineKeyboardMarkup, MessageId, UserId};

use photo_stickers::bot::{Messenger, StickerFlow};
use photo_stickers::background::BackgroundRemover;
use photo_stickers::config::{PackConfig, PackIdentitySource};
use photo_stickers::dialogue::{ConversationId, MessageRef, SessionStore};
use photo_stickers::errors::{PlatformError, StickerError};
use photo_stickers::pack_registry::{PackRegistry, PackStore};
use photo_stickers::sticker_image::{StickerAsset, StickerNormalizer};

pub const CHAT: ChatId = ChatId(1001);
pub const USER: UserId = UserId(2002);
pub const OWNER: UserId = UserId(42);

pub fn conversation() -> ConversationId {
    ConversationId::new(CHAT, USER)
}

/// PNG of the given size filled with one color
pub fn png(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
    encode(&RgbaImage::from_pixel(width, height, Rgba(color)))
}

pub fn encode(image: &RgbaImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgba8(image.clone())
        .write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)
        .unwrap();
    bytes
}

#[derive(Debug, Clone, PartialEq)]
pub struct SentMessage {
    pub message: MessageRef,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct EditedMessage {
    pub message: MessageRef,
    pub text: String,
    pub keyboard: Option<InlineKeyboardMarkup>,
}

impl EditedMessage {
    pub fn callback_data(&self) -> Vec<String> {
        self.keyboard
            .iter()
            .flat_map(|k| k.inline_keyboard.iter().flatten())
            .filter_map(|button| match &button.kind {
                InlineKeyboardButtonKind::CallbackData(data) => Some(data.clone()),
                _ => None,
            })
            .collect()
    }
}

/// Records every message instead of talking to Telegram
pub struct FakeMessenger {
    next_id: AtomicI32,
    pub sent: Mutex<Vec<SentMessage>>,
    pub edits: Mutex<Vec<EditedMessage>>,
    pub downloads: Mutex<Vec<FileId>>,
    download_result: Mutex<Result<Vec<u8>, PlatformError>>,
    edit_error: Mutex<Option<PlatformError>>,
}

impl FakeMessenger {
    pub fn new(photo: Vec<u8>) -> Self {
        Self {
            next_id: AtomicI32::new(1),
            sent: Mutex::new(Vec::new()),
            edits: Mutex::new(Vec::new()),
            downloads: Mutex::new(Vec::new()),
            download_result: Mutex::new(Ok(photo)),
            edit_error: Mutex::new(None),
        }
    }

    pub fn fail_downloads(&self, err: PlatformError) {
        *self.download_result.lock().unwrap() = Err(err);
    }

    /// Every following edit fails with `err` and is not recorded
    pub fn fail_edits(&self, err: PlatformError) {
        *self.edit_error.lock().unwrap() = Some(err);
    }

    pub fn sent_texts(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|m| m.text.clone()).collect()
    }

    pub fn last_sent(&self) -> SentMessage {
        self.sent.lock().unwrap().last().cloned().expect("nothing was sent")
    }

    pub fn edits(&self) -> Vec<EditedMessage> {
        self.edits.lock().unwrap().clone()
    }

    pub fn last_edit(&self) -> EditedMessage {
        self.edits().last().cloned().expect("nothing was edited")
    }
}

#[async_trait]
impl Messenger for FakeMessenger {
    async fn send_text(&self, chat: ChatId, text: String) -> Result<MessageRef, PlatformError> {
        let message = MessageRef {
            chat,
            id: MessageId(self.next_id.fetch_add(1, Ordering::SeqCst)),
        };
        self.sent.lock().unwrap().push(SentMessage { message, text });
        Ok(message)
    }

    async fn edit_text(
        &self,
        message: MessageRef,
        text: String,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> Result<(), PlatformError> {
        if let Some(err) = self.edit_error.lock().unwrap().clone() {
            return Err(err);
        }
        self.edits.lock().unwrap().push(EditedMessage {
            message,
            text,
            keyboard,
        });
        Ok(())
    }

    async fn download(&self, file_id: FileId) -> Result<Vec<u8>, PlatformError> {
        self.downloads.lock().unwrap().push(file_id);
        self.download_result.lock().unwrap().clone()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    Create { owner: UserId, name: String, title: String, emoji: String, width: u32, height: u32 },
    Add { owner: UserId, name: String, emoji: String, width: u32, height: u32 },
}

/// In-memory sticker sets
pub struct FakePackStore {
    pub username: String,
    pub username_calls: AtomicUsize,
    pub fetch_calls: AtomicUsize,
    pub exists: Mutex<bool>,
    /// Errors returned by the next `fetch_pack` calls before the real answer
    pub fetch_errors: Mutex<VecDeque<PlatformError>>,
    pub create_error: Mutex<Option<PlatformError>>,
    pub add_error: Mutex<Option<PlatformError>>,
    pub calls: Mutex<Vec<StoreCall>>,
}

impl FakePackStore {
    pub fn new(username: &str) -> Self {
        Self {
            username: username.to_string(),
            username_calls: AtomicUsize::new(0),
            fetch_calls: AtomicUsize::new(0),
            exists: Mutex::new(false),
            fetch_errors: Mutex::new(VecDeque::new()),
            create_error: Mutex::new(None),
            add_error: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_existing_pack(self) -> Self {
        *self.exists.lock().unwrap() = true;
        self
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PackStore for FakePackStore {
    async fn bot_username(&self) -> Result<String, PlatformError> {
        self.username_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.username.clone())
    }

    async fn fetch_pack(&self, name: &str) -> Result<(), PlatformError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.fetch_errors.lock().unwrap().pop_front() {
            return Err(err);
        }
        if *self.exists.lock().unwrap() {
            Ok(())
        } else {
            Err(PlatformError::NotFound(format!("STICKERSET_INVALID: {name}")))
        }
    }

    async fn create_pack(
        &self,
        owner: UserId,
        name: &str,
        title: &str,
        sticker: StickerAsset,
        emoji: &str,
    ) -> Result<(), PlatformError> {
        self.calls.lock().unwrap().push(StoreCall::Create {
            owner,
            name: name.to_string(),
            title: title.to_string(),
            emoji: emoji.to_string(),
            width: sticker.width(),
            height: sticker.height(),
        });
        if let Some(err) = self.create_error.lock().unwrap().clone() {
            return Err(err);
        }
        *self.exists.lock().unwrap() = true;
        Ok(())
    }

    async fn add_to_pack(
        &self,
        owner: UserId,
        name: &str,
        sticker: StickerAsset,
        emoji: &str,
    ) -> Result<(), PlatformError> {
        self.calls.lock().unwrap().push(StoreCall::Add {
            owner,
            name: name.to_string(),
            emoji: emoji.to_string(),
            width: sticker.width(),
            height: sticker.height(),
        });
        match self.add_error.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Passes images through unchanged and counts the calls
#[derive(Default)]
pub struct CountingRemover {
    pub calls: AtomicUsize,
    pub failure: Option<String>,
}

impl CountingRemover {
    pub fn failing(reason: &str) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            failure: Some(reason.to_string()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BackgroundRemover for CountingRemover {
    async fn remove_background(&self, image: Vec<u8>) -> Result<Vec<u8>, StickerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.failure {
            Some(reason) => Err(StickerError::ImageProcessing(reason.clone())),
            None => Ok(image),
        }
    }
}

pub fn pack_config(identity: PackIdentitySource) -> PackConfig {
    PackConfig {
        identity,
        title: "Shared Sticker Pack".to_string(),
        emoji: "⭐".to_string(),
        owner: OWNER,
    }
}

pub fn derived_pack() -> PackConfig {
    pack_config(PackIdentitySource::Derived {
        prefix: "funstickers".to_string(),
    })
}

/// A flow wired to fakes
pub struct Harness {
    pub messenger: Arc<FakeMessenger>,
    pub store: Arc<FakePackStore>,
    pub remover: Arc<CountingRemover>,
    pub registry: Arc<PackRegistry>,
    pub flow: StickerFlow,
}

impl Harness {
    pub fn new(photo: Vec<u8>, store: FakePackStore, remover: CountingRemover) -> Self {
        let messenger = Arc::new(FakeMessenger::new(photo));
        let store = Arc::new(store);
        let remover = Arc::new(remover);
        let registry = Arc::new(PackRegistry::new(store.clone(), derived_pack()));
        let flow = StickerFlow::new(
            messenger.clone(),
            StickerNormalizer::new(remover.clone()),
            registry.clone(),
            SessionStore::default(),
        );
        Self {
            messenger,
            store,
            remover,
            registry,
            flow,
        }
    }

    pub fn default_with_photo(photo: Vec<u8>) -> Self {
        Self::new(photo, FakePackStore::new("StickerBot"), CountingRemover::default())
    }
}

pub const PACK_LINK: &str = "https://t.me/addstickers/funstickers_by_stickerbot";
