//! Scene document building and XML model file emission.
//!
//! The document is an [`Item`] tree rooted at a `Level` folder:
//!
//! ```text
//! Level
//! └── Map
//!     ├── Collision   (one MeshPart per collision placement)
//!     └── Visual      (one MeshPart per visual placement)
//! ```
//!
//! followed by a trailer of shared strings holding the encoded physics
//! proxies that collision parts refer to by hash.

use std::borrow::Cow;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::fmt::{self, Write};
use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use glam::{Mat3, Vec3};
use md5::{Digest, Md5};
use salvl_decode::{LevelGeometry, MeshPartInstance, PartRef, Placements, ProxyCache};

use crate::error::{Error, Result};

/// Column width of line-broken base64 text.
const BASE64_LINE: usize = 72;

const ROOT_OPEN: &str = r#"<roblox xmlns:xmime="http://www.w3.org/2005/05/xmlmime" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:noNamespaceSchemaLocation="http://www.roblox.com/roblox.xsd" version="4">"#;

/// A typed item property.
#[derive(Debug, Clone, PartialEq)]
pub enum Property {
    String(String),
    Bool(bool),
    Float(f32),
    Token(u32),
    /// 24-bit RGB.
    Color3uint8(u32),
    CoordinateFrame { position: Vec3, rotation: Mat3 },
    Vector3(Vec3),
    /// Asset URL.
    Content(String),
    /// Key into the document's shared strings.
    SharedString(String),
}

/// An instance in the scene tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub class: &'static str,
    pub properties: Vec<(&'static str, Property)>,
    pub children: Vec<Item>,
}

impl Item {
    #[must_use]
    pub fn new(class: &'static str) -> Self {
        Self {
            class,
            properties: Vec::new(),
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn folder(name: &str) -> Self {
        Self::new("Folder").with("Name", Property::String(name.to_owned()))
    }

    #[must_use]
    pub fn with(mut self, name: &'static str, value: Property) -> Self {
        self.properties.push((name, value));
        self
    }

    #[must_use]
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|(n, _)| *n == name).map(|(_, v)| v)
    }

    /// First child whose `Name` is `name`.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&Item> {
        self.children
            .iter()
            .find(|c| matches!(c.property("Name"), Some(Property::String(n)) if n == name))
    }
}

/// A shared string entry: base64 text plus its hash key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedString {
    pub key: String,
    pub value: String,
}

/// Base64-encode `data`, breaking lines every 72 characters.
#[must_use]
pub fn base64_lines(data: &[u8]) -> String {
    let encoded = STANDARD.encode(data);
    let mut out = String::with_capacity(encoded.len() + encoded.len() / BASE64_LINE);
    for (i, c) in encoded.chars().enumerate() {
        if i != 0 && i % BASE64_LINE == 0 {
            out.push('\n');
        }
        out.push(c);
    }
    out
}

/// Encode a physics proxy blob as a shared string.
///
/// The key is the base64 MD5 digest of the line-broken base64 text.
#[must_use]
pub fn encode_proxy(blob: &[u8]) -> SharedString {
    let value = base64_lines(blob);
    let key = base64_lines(&Md5::digest(value.as_bytes()));
    SharedString { key, value }
}

/// Escape text for use in XML content or attribute values.
#[must_use]
pub fn escape(text: &str) -> Cow<'_, str> {
    if !text.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// A complete scene document.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub root: Item,
    shared_strings: Vec<SharedString>,
    shared_keys: HashSet<String>,
}

impl Scene {
    #[must_use]
    pub fn new(root: Item) -> Self {
        Self {
            root,
            shared_strings: Vec::new(),
            shared_keys: HashSet::new(),
        }
    }

    /// Add a shared string unless one with the same key is already present.
    pub fn add_shared_string(&mut self, shared: SharedString) {
        if self.shared_keys.insert(shared.key.clone()) {
            self.shared_strings.push(shared);
        }
    }

    #[must_use]
    pub fn shared_strings(&self) -> &[SharedString] {
        &self.shared_strings
    }

    /// Emit the document as XML.
    pub fn write_xml(&self, out: &mut impl Write) -> fmt::Result {
        writeln!(out, "{ROOT_OPEN}")?;
        write_item(out, &self.root)?;
        writeln!(out, "<SharedStrings>")?;
        for shared in &self.shared_strings {
            writeln!(
                out,
                r#"<SharedString md5="{}">{}</SharedString>"#,
                escape(&shared.key),
                escape(&shared.value)
            )?;
        }
        writeln!(out, "</SharedStrings>")?;
        writeln!(out, "</roblox>")
    }

    /// Write the document to `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_string()).map_err(|e| Error::io(path, e))
    }
}

impl fmt::Display for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_xml(f)
    }
}

fn write_item(out: &mut impl Write, item: &Item) -> fmt::Result {
    writeln!(out, r#"<Item class="{}">"#, item.class)?;
    writeln!(out, "<Properties>")?;
    for (name, value) in &item.properties {
        write_property(out, name, value)?;
    }
    writeln!(out, "</Properties>")?;
    for child in &item.children {
        write_item(out, child)?;
    }
    writeln!(out, "</Item>")
}

fn write_vec3(out: &mut impl Write, v: Vec3) -> fmt::Result {
    writeln!(out, "<X>{}</X>", v.x)?;
    writeln!(out, "<Y>{}</Y>", v.y)?;
    writeln!(out, "<Z>{}</Z>", v.z)
}

fn write_property(out: &mut impl Write, name: &str, value: &Property) -> fmt::Result {
    match value {
        Property::String(s) => writeln!(out, r#"<string name="{name}">{}</string>"#, escape(s)),
        Property::Bool(b) => writeln!(out, r#"<bool name="{name}">{b}</bool>"#),
        Property::Float(v) => writeln!(out, r#"<float name="{name}">{v}</float>"#),
        Property::Token(v) => writeln!(out, r#"<token name="{name}">{v}</token>"#),
        Property::Color3uint8(v) => writeln!(out, r#"<Color3uint8 name="{name}">{v}</Color3uint8>"#),
        Property::CoordinateFrame { position, rotation } => {
            writeln!(out, r#"<CoordinateFrame name="{name}">"#)?;
            write_vec3(out, *position)?;
            for r in 0..3 {
                let row = rotation.row(r);
                for c in 0..3 {
                    writeln!(out, "<R{r}{c}>{}</R{r}{c}>", row[c])?;
                }
            }
            writeln!(out, "</CoordinateFrame>")
        }
        Property::Vector3(v) => {
            writeln!(out, r#"<Vector3 name="{name}">"#)?;
            write_vec3(out, *v)?;
            writeln!(out, "</Vector3>")
        }
        Property::Content(url) => writeln!(out, r#"<Content name="{name}"><url>{}</url></Content>"#, escape(url)),
        Property::SharedString(key) => {
            writeln!(out, r#"<SharedString name="{name}">{}</SharedString>"#, escape(key))
        }
    }
}

/// Texture reference of a mesh part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureAsset {
    pub url: String,
    pub transparent: bool,
}

/// Asset references of one mesh part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartAssets {
    pub mesh_url: String,
    pub texture: Option<TextureAsset>,
    /// 24-bit RGB.
    pub diffuse: u32,
}

/// Build the scene document for a level's placements.
///
/// Translations and sizes are multiplied by `scale`; `InitialSize` and
/// rotations are not. Each collision part gets its physics proxy built and
/// encoded once, however many placements share it.
#[must_use]
pub fn build_scene(
    geometry: &LevelGeometry,
    placements: &Placements,
    assets: &HashMap<PartRef, PartAssets>,
    scale: f32,
) -> Scene {
    let mut scene = Scene::new(Item::folder("Level"));
    let mut proxies = ProxyCache::new();
    let mut proxy_keys: HashMap<PartRef, String> = HashMap::new();

    let mut collision = Item::folder("Collision");
    for placed in &placements.collision {
        let (Some(part), Some(part_assets)) = (geometry.part(placed.part), assets.get(&placed.part)) else {
            tracing::warn!(part = ?placed.part, "collision placement has no part or assets");
            continue;
        };
        let key = match proxy_keys.entry(placed.part) {
            Entry::Occupied(entry) => entry.get().clone(),
            Entry::Vacant(entry) => {
                let shared = encode_proxy(proxies.get_or_build(placed.part, part));
                let key = shared.key.clone();
                scene.add_shared_string(shared);
                entry.insert(key).clone()
            }
        };
        collision
            .children
            .push(mesh_part_item(placed, part_assets, scale, true, Some(key)));
    }

    let mut visual = Item::folder("Visual");
    for placed in &placements.visual {
        let Some(part_assets) = assets.get(&placed.part) else {
            tracing::warn!(part = ?placed.part, "visual placement has no assets");
            continue;
        };
        visual
            .children
            .push(mesh_part_item(placed, part_assets, scale, false, None));
    }

    let mut map = Item::folder("Map");
    map.children.push(collision);
    map.children.push(visual);
    scene.root.children.push(map);

    tracing::debug!(proxies = proxies.len(), "built scene");
    scene
}

fn mesh_part_item(
    placed: &MeshPartInstance,
    assets: &PartAssets,
    scale: f32,
    can_collide: bool,
    proxy_key: Option<String>,
) -> Item {
    let mut item = Item::new("MeshPart")
        .with("Name", Property::String("MeshPart".into()))
        .with("Anchored", Property::Bool(true))
        .with("CanCollide", Property::Bool(can_collide))
        .with("CanTouch", Property::Bool(false))
        .with("DoubleSided", Property::Bool(true))
        .with(
            "CFrame",
            Property::CoordinateFrame {
                position: placed.position * scale,
                rotation: placed.rotation,
            },
        )
        .with("size", Property::Vector3(placed.size * scale))
        .with("InitialSize", Property::Vector3(placed.size))
        .with("MeshID", Property::Content(assets.mesh_url.clone()));

    let transparent_texture = match &assets.texture {
        Some(texture) if !texture.transparent => {
            item = item.with("TextureID", Property::Content(texture.url.clone()));
            None
        }
        Some(texture) => Some(texture.url.clone()),
        None => None,
    };

    if let Some(key) = proxy_key {
        item = item.with("PhysicalConfigData", Property::SharedString(key));
    }
    let transparency = if placed.surface.is_visible() { 0.0 } else { 1.0 };
    item = item
        .with("Transparency", Property::Float(transparency))
        .with("Color3uint8", Property::Color3uint8(assets.diffuse));

    if let Some(url) = transparent_texture {
        item.children.push(
            Item::new("SurfaceAppearance")
                .with("AlphaMode", Property::Token(1))
                .with("ColorMap", Property::Content(url)),
        );
    }

    item
}
