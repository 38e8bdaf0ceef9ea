//! Static game catalog: items, biomes and loot tables.
//!
//! The catalog is loaded once from JSON files under a data directory and is
//! immutable afterwards. Each file is a single JSON object keyed by
//! identifier; loot-table files additionally carry a `"name"` pseudo-key.
//! Object key order is preserved, and definition order matters: loot tables
//! roll entries in file order and explore checks biome discoveries in file
//! order.
//!
//! ```text
//! <dir>/items.json
//! <dir>/biomes.json
//! <dir>/loot_tables/*.json
//! ```
//!
//! Every entry is converted into a typed record and the whole catalog is
//! cross-validated before it is handed out, so malformed data fails at
//! startup rather than on first use.

use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::logutil::player_text;
use crate::survival::errors::SurvivalError;
use crate::survival::flags::{Achievements, Enchantments};
use crate::survival::types::PlayerRecord;

/// Prefix of the loot table rolled when exploring a biome.
pub const EXPLORATION_TABLE_PREFIX: &str = "exploration_";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    Material,
    Tool,
    Food,
    Block,
    Misc,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecipeIngredient {
    pub item_id: String,
    pub quantity: u32,
}

/// An obtainable item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Item {
    pub id: String,
    pub display_name: String,
    pub description: String,
    pub rarity: Rarity,
    pub item_type: ItemType,
    /// Durability capacity. Items with durability never stack.
    pub durability: Option<u32>,
    pub food_hp_restored: Option<f64>,
    pub crafting_recipe: Option<Vec<RecipeIngredient>>,
    pub crafting_quantity: u32,
    /// Raw item that smelts into this one.
    pub smelting_recipe: Option<String>,
    /// Item this one smelts into.
    pub smelting_product: Option<String>,
    pub supported_enchantments: Enchantments,
}

impl Item {
    pub fn has_durability(&self) -> bool {
        self.durability.is_some()
    }

    pub fn is_food(&self) -> bool {
        self.food_hp_restored.is_some()
    }

    /// Obtainable at a crafting table or a furnace.
    pub fn is_craftable(&self) -> bool {
        self.crafting_recipe.is_some() || self.smelting_recipe.is_some()
    }

    pub fn enchantable(&self) -> bool {
        !self.supported_enchantments.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Biome {
    pub id: String,
    pub display_name: String,
    pub description: String,
    pub rarity: Rarity,
    pub discovery_probability: f64,
    /// Achievement bits required to count as discovered. Empty means always discovered.
    pub discovery_achievement: Achievements,
}

impl Biome {
    pub fn discovered(&self, player: &PlayerRecord) -> bool {
        self.discovery_achievement.is_empty()
            || player.achievements.contains_all(self.discovery_achievement)
    }

    pub fn loot_table_name(&self) -> String {
        format!("{}{}", EXPLORATION_TABLE_PREFIX, self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LootTableItem {
    pub item_id: String,
    pub probability: f64,
    /// Inclusive quantity range.
    pub quantity: (u32, u32),
    /// Inclusive durability range, only for durability-bearing items.
    pub durability: Option<(u32, u32)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LootTable {
    pub name: String,
    /// Entries in definition order.
    pub entries: Vec<LootTableItem>,
}

/// Immutable lookup tables shared by every action rule.
#[derive(Debug, Clone)]
pub struct Catalog {
    items: HashMap<String, Item>,
    item_order: Vec<String>,
    biomes: Vec<Biome>,
    loot_tables: HashMap<String, LootTable>,
}

impl Catalog {
    /// Load and validate the catalog rooted at `dir`.
    pub fn load<P: AsRef<Path>>(dir: P) -> Result<Self, SurvivalError> {
        let dir = dir.as_ref();
        let items = load_items_from_json(dir.join("items.json"))?;
        let biomes = load_biomes_from_json(dir.join("biomes.json"))?;
        let loot_tables = load_loot_tables_from_dir(dir.join("loot_tables"))?;
        let catalog = Self::from_parts(items, biomes, loot_tables)?;
        info!(
            "Loaded catalog from {}: {} items, {} biomes, {} loot tables",
            dir.display(),
            catalog.items.len(),
            catalog.biomes.len(),
            catalog.loot_tables.len()
        );
        Ok(catalog)
    }

    /// Build a catalog from already-typed parts, running full validation.
    pub fn from_parts(
        items: Vec<Item>,
        biomes: Vec<Biome>,
        loot_tables: Vec<LootTable>,
    ) -> Result<Self, SurvivalError> {
        let mut item_map = HashMap::with_capacity(items.len());
        let mut item_order = Vec::with_capacity(items.len());
        for item in items {
            if item_map.contains_key(&item.id) {
                return Err(SurvivalError::invalid(&item.id, "duplicate item id"));
            }
            item_order.push(item.id.clone());
            item_map.insert(item.id.clone(), item);
        }

        let mut table_map = HashMap::with_capacity(loot_tables.len());
        for table in loot_tables {
            if table_map.contains_key(&table.name) {
                return Err(SurvivalError::invalid(&table.name, "duplicate loot table name"));
            }
            table_map.insert(table.name.clone(), table);
        }

        let catalog = Self {
            items: item_map,
            item_order,
            biomes,
            loot_tables: table_map,
        };
        catalog.validate()?;
        Ok(catalog)
    }

    fn validate(&self) -> Result<(), SurvivalError> {
        for id in &self.item_order {
            let item = &self.items[id];
            validate_item(self, item)?;
        }

        let mut seen = std::collections::HashSet::new();
        for biome in &self.biomes {
            if !seen.insert(biome.id.as_str()) {
                return Err(SurvivalError::invalid(&biome.id, "duplicate biome id"));
            }
            if !(0.0..=1.0).contains(&biome.discovery_probability) {
                return Err(SurvivalError::invalid(
                    &biome.id,
                    "discovery_probability must be within [0, 1]",
                ));
            }
            if !self.loot_tables.contains_key(&biome.loot_table_name()) {
                return Err(SurvivalError::invalid(
                    &biome.id,
                    format!("missing loot table {}", biome.loot_table_name()),
                ));
            }
        }

        for table in self.loot_tables.values() {
            for entry in &table.entries {
                let label = format!("{}.{}", table.name, entry.item_id);
                let Some(item) = self.items.get(&entry.item_id) else {
                    return Err(SurvivalError::invalid(label, "unknown item id"));
                };
                if !(0.0..=1.0).contains(&entry.probability) {
                    return Err(SurvivalError::invalid(label, "probability must be within [0, 1]"));
                }
                let (min, max) = entry.quantity;
                if min == 0 || min > max {
                    return Err(SurvivalError::invalid(
                        label,
                        "quantity range must satisfy 1 <= min <= max",
                    ));
                }
                match (entry.durability, item.durability) {
                    (Some((lo, hi)), Some(capacity)) => {
                        if lo == 0 || lo > hi || hi > capacity {
                            return Err(SurvivalError::invalid(
                                label,
                                format!("durability range must satisfy 1 <= min <= max <= {}", capacity),
                            ));
                        }
                    }
                    (None, None) => {}
                    (Some(_), None) => {
                        return Err(SurvivalError::invalid(
                            label,
                            "durability range given for an item without durability",
                        ));
                    }
                    (None, Some(_)) => {
                        return Err(SurvivalError::invalid(
                            label,
                            "durability items need a durability range",
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    pub fn item(&self, id: &str) -> Option<&Item> {
        self.items.get(id)
    }

    /// Look up an item or fail with a user-facing error.
    pub fn require_item(&self, id: &str) -> Result<&Item, SurvivalError> {
        self.items
            .get(id)
            .ok_or_else(|| SurvivalError::UnknownItem(player_text(id).to_string()))
    }

    /// Items in definition order.
    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.item_order.iter().map(move |id| &self.items[id])
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn biome(&self, id: &str) -> Option<&Biome> {
        self.biomes.iter().find(|b| b.id == id)
    }

    /// Biomes in definition order.
    pub fn biomes(&self) -> &[Biome] {
        &self.biomes
    }

    pub fn loot_table(&self, name: &str) -> Option<&LootTable> {
        self.loot_tables.get(name)
    }

    pub fn require_loot_table(&self, name: &str) -> Result<&LootTable, SurvivalError> {
        self.loot_tables
            .get(name)
            .ok_or_else(|| SurvivalError::NotFound(format!("loot table: {}", name)))
    }

    /// Biomes the player may currently explore, in definition order.
    pub fn discovered_biomes<'a>(&'a self, player: &'a PlayerRecord) -> impl Iterator<Item = &'a Biome> {
        self.biomes.iter().filter(move |b| b.discovered(player))
    }
}

fn validate_item(catalog: &Catalog, item: &Item) -> Result<(), SurvivalError> {
    if item.durability == Some(0) {
        return Err(SurvivalError::invalid(&item.id, "durability must be positive"));
    }
    if let Some(hp) = item.food_hp_restored {
        if hp.is_nan() || hp <= 0.0 {
            return Err(SurvivalError::invalid(&item.id, "food_hp_restored must be positive"));
        }
    }
    if let Some(recipe) = &item.crafting_recipe {
        if item.crafting_quantity < 1 {
            return Err(SurvivalError::invalid(&item.id, "crafting_quantity must be at least 1"));
        }
        if recipe.is_empty() {
            return Err(SurvivalError::invalid(&item.id, "crafting recipe is empty"));
        }
        for ingredient in recipe {
            if ingredient.quantity == 0 {
                return Err(SurvivalError::invalid(
                    &item.id,
                    format!("ingredient {} has zero quantity", ingredient.item_id),
                ));
            }
            if !catalog.items.contains_key(&ingredient.item_id) {
                return Err(SurvivalError::invalid(
                    &item.id,
                    format!("unknown ingredient {}", ingredient.item_id),
                ));
            }
        }
    }
    if let Some(input) = &item.smelting_recipe {
        let paired = catalog
            .items
            .get(input)
            .and_then(|raw| raw.smelting_product.as_deref());
        if paired != Some(item.id.as_str()) {
            return Err(SurvivalError::invalid(
                &item.id,
                format!("smelting input {} must name this item as its smelting_product", input),
            ));
        }
    }
    if let Some(product) = &item.smelting_product {
        let paired = catalog
            .items
            .get(product)
            .and_then(|out| out.smelting_recipe.as_deref());
        if paired != Some(item.id.as_str()) {
            return Err(SurvivalError::invalid(
                &item.id,
                format!("smelting product {} must name this item as its smelting_recipe", product),
            ));
        }
    }
    Ok(())
}

/// Turn a free-form item name into a catalog id ("Iron Ingot" -> "iron_ingot").
pub fn normalize_id(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "_")
}

// ============================================================================
// JSON loaders
// ============================================================================

fn read_object(path: &Path) -> Result<Map<String, Value>, SurvivalError> {
    let contents = fs::read_to_string(path)?;
    serde_json::from_str(&contents).map_err(|source| SurvivalError::CatalogParse {
        file: path.display().to_string(),
        source,
    })
}

fn parse_entry<T: serde::de::DeserializeOwned>(
    path: &Path,
    id: &str,
    value: Value,
) -> Result<T, SurvivalError> {
    serde_json::from_value(value).map_err(|e| {
        SurvivalError::invalid(format!("{}:{}", path.display(), id), e.to_string())
    })
}

/// Load items from `items.json`.
pub fn load_items_from_json<P: AsRef<Path>>(path: P) -> Result<Vec<Item>, SurvivalError> {
    let path = path.as_ref();
    let object = read_object(path)?;
    let mut items = Vec::with_capacity(object.len());
    for (id, value) in object {
        let seed: ItemSeed = parse_entry(path, &id, value)?;
        let crafting_recipe = match seed.crafting_recipe {
            Some(recipe) => Some(parse_recipe(&id, recipe)?),
            None => None,
        };
        items.push(Item {
            id,
            display_name: seed.display_name,
            description: seed.description,
            rarity: seed.rarity,
            item_type: seed.item_type,
            durability: seed.durability,
            food_hp_restored: seed.food_hp_restored,
            crafting_recipe,
            crafting_quantity: seed.crafting_quantity,
            smelting_recipe: seed.smelting_recipe,
            smelting_product: seed.smelting_product,
            supported_enchantments: Enchantments::from_bits(seed.supported_enchantments),
        });
    }
    debug!("Parsed {} items from {}", items.len(), path.display());
    Ok(items)
}

fn parse_recipe(id: &str, recipe: Map<String, Value>) -> Result<Vec<RecipeIngredient>, SurvivalError> {
    recipe
        .into_iter()
        .map(|(item_id, quantity)| {
            let quantity = quantity
                .as_u64()
                .and_then(|q| u32::try_from(q).ok())
                .ok_or_else(|| {
                    SurvivalError::invalid(id, format!("ingredient {} needs a whole quantity", item_id))
                })?;
            Ok(RecipeIngredient { item_id, quantity })
        })
        .collect()
}

/// Load biomes from `biomes.json`.
pub fn load_biomes_from_json<P: AsRef<Path>>(path: P) -> Result<Vec<Biome>, SurvivalError> {
    let path = path.as_ref();
    let object = read_object(path)?;
    let mut biomes = Vec::with_capacity(object.len());
    for (id, value) in object {
        let seed: BiomeSeed = parse_entry(path, &id, value)?;
        biomes.push(Biome {
            id,
            display_name: seed.display_name,
            description: seed.description,
            rarity: seed.rarity,
            discovery_probability: seed.discovery_probability,
            discovery_achievement: Achievements::from_bits(seed.discovery_achievement),
        });
    }
    Ok(biomes)
}

/// Load one loot table file. The `"name"` key names the table; every other key is an item id.
pub fn load_loot_table_from_json<P: AsRef<Path>>(path: P) -> Result<LootTable, SurvivalError> {
    let path = path.as_ref();
    let object = read_object(path)?;
    let name = match object.get("name") {
        Some(Value::String(name)) => name.clone(),
        _ => {
            return Err(SurvivalError::invalid(
                path.display().to_string(),
                "loot table is missing a string \"name\" key",
            ))
        }
    };
    let mut entries = Vec::with_capacity(object.len());
    // Entries stay in file order; "name" is skipped rather than removed.
    for (item_id, value) in object.into_iter().filter(|(key, _)| key != "name") {
        let seed: LootTableItemSeed = parse_entry(path, &item_id, value)?;
        entries.push(LootTableItem {
            item_id,
            probability: seed.probability,
            quantity: seed.quantity,
            durability: seed.durability,
        });
    }
    Ok(LootTable { name, entries })
}

/// Load every `*.json` loot table in `dir`, in file name order.
pub fn load_loot_tables_from_dir<P: AsRef<Path>>(dir: P) -> Result<Vec<LootTable>, SurvivalError> {
    let mut paths: Vec<_> = fs::read_dir(dir.as_ref())?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().map(|ext| ext == "json").unwrap_or(false))
        .collect();
    paths.sort();
    paths.iter().map(load_loot_table_from_json).collect()
}

// ============================================================================
// Seed data structures that match JSON format
// ============================================================================

fn default_crafting_quantity() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
struct ItemSeed {
    display_name: String,
    description: String,
    rarity: Rarity,
    #[serde(rename = "type")]
    item_type: ItemType,
    #[serde(default)]
    supported_enchantments: u32,
    #[serde(default = "default_crafting_quantity")]
    crafting_quantity: u32,
    #[serde(default)]
    crafting_recipe: Option<Map<String, Value>>,
    #[serde(default)]
    smelting_recipe: Option<String>,
    #[serde(default)]
    smelting_product: Option<String>,
    #[serde(default)]
    durability: Option<u32>,
    #[serde(default)]
    food_hp_restored: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct BiomeSeed {
    display_name: String,
    description: String,
    rarity: Rarity,
    discovery_probability: f64,
    #[serde(default)]
    discovery_achievement: u64,
}

#[derive(Debug, Deserialize)]
struct LootTableItemSeed {
    probability: f64,
    quantity: (u32, u32),
    #[serde(default)]
    durability: Option<(u32, u32)>,
}
