// Copyright 2023 Quarry Labs
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use log::debug;
use log::trace;
use parking_lot::RwLock;
use quarry_common_exception::ErrorCode;
use quarry_common_exception::Result;
use quarry_common_expression::choose_hash_method_with_types;
use quarry_common_expression::BlockEntry;
use quarry_common_expression::Column;
use quarry_common_expression::DataBlock;
use quarry_common_expression::DataType;
use quarry_common_expression::HashMethodKind;
use quarry_common_expression::Value;
use quarry_common_hashtable::RowPtr;

use crate::asof::AsofRowRefs;
use crate::asof::AsofType;
use crate::common::default_column;
use crate::common::extract_nested_columns_and_null_map;
use crate::common::materialize_keys;
use crate::desc::HashJoinDesc;
use crate::desc::JoinKind;
use crate::desc::JoinStrictness;
use crate::join_hash_table::map_getter;
use crate::join_hash_table::HashJoinHashTable;
use crate::join_hash_table::JoinMaps;
use crate::join_hash_table::MapsKind;
use crate::non_joined::NonJoinedBlockStream;
use crate::probe::JoinFeatures;
use crate::row::RowRefList;
use crate::row::RowSpace;
use crate::used_flags::JoinUsedFlags;

/// The shared right-side state: storage plus one set of maps per disjunct.
/// `reuse_joined_data` shares this between operator instances.
pub(crate) struct RightTableData {
    pub row_space: RowSpace,
    pub maps: Vec<JoinMaps>,
}

/// The hash-join operator.
///
/// Construction decides the keyed representation from the right key column
/// types; `add_right_block` materializes right blocks into it; `join_block`
/// probes left blocks, possibly from several threads at once. Outer shapes
/// drain their unmatched right rows with `create_non_joined_stream`.
pub struct HashJoin {
    pub(crate) desc: HashJoinDesc,
    any_take_last_row: bool,
    pub(crate) method: Option<HashMethodKind>,
    pub(crate) need_flags: bool,
    pub(crate) key_sizes: Vec<Vec<usize>>,
    pub(crate) asof_type: Option<AsofType>,
    pub(crate) right_table_keys: DataBlock,
    pub(crate) sample_block_with_columns_to_add: DataBlock,
    /// `(right key name, left source name)` pairs for keys the output must
    /// carry even though they equal the left keys.
    pub(crate) required_right_keys: Vec<(String, String)>,
    pub(crate) data: Arc<RwLock<RightTableData>>,
    pub(crate) used_flags: RwLock<JoinUsedFlags>,
    pub(crate) sealed: AtomicBool,
    totals: RwLock<Option<DataBlock>>,
}

impl std::fmt::Debug for HashJoin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HashJoin").finish_non_exhaustive()
    }
}

impl HashJoin {
    pub fn new(
        desc: HashJoinDesc,
        right_sample_block: DataBlock,
        any_take_last_row: bool,
    ) -> Result<HashJoin> {
        desc.validate()?;

        let multiple_disjuncts = desc.multiple_disjuncts();
        let right_sample_block = right_sample_block.convert_to_full();

        let (maps_kind, need_flags) = if desc.kind == JoinKind::Cross {
            (MapsKind::One, false)
        } else {
            map_getter(desc.kind, desc.strictness)?
        };

        // Split the right sample into key columns and columns to add. With
        // multiple disjuncts the split is not well defined, so the whole
        // sample plays both roles.
        let (right_table_keys, mut sample_block_with_columns_to_add) =
            if desc.kind == JoinKind::Cross {
                (DataBlock::empty(), right_sample_block.clone())
            } else if multiple_disjuncts {
                (right_sample_block.clone(), right_sample_block.clone())
            } else {
                Self::split_additional_columns(&desc, &right_sample_block)?
            };

        let mut required_right_keys = Vec::new();
        if !multiple_disjuncts && desc.kind != JoinKind::Cross {
            for (i, right_name) in desc.key_names_right[0].iter().enumerate() {
                if desc.required_right_keys.contains(right_name) {
                    required_right_keys
                        .push((right_name.clone(), desc.key_names_left[0][i].clone()));
                }
            }
        }

        // Choose the keyed representation per disjunct; disagreeing
        // disjuncts collapse to the serialized-hash method.
        let mut method: Option<HashMethodKind> = None;
        let mut key_sizes = Vec::with_capacity(desc.key_names_right.len());
        let mut asof_type = None;
        if desc.kind != JoinKind::Cross {
            for key_names in &desc.key_names_right {
                let mut key_types = Vec::with_capacity(key_names.len());
                for name in key_names {
                    let entry = right_table_keys.get_by_name(name).ok_or_else(|| {
                        ErrorCode::NoSuchColumnInTable(format!(
                            "not found column {} in the right table",
                            name
                        ))
                    })?;
                    key_types.push(entry.data_type.clone());
                }

                let mut asof_size = None;
                if desc.strictness == JoinStrictness::Asof {
                    if key_types.len() <= 1 {
                        return Err(ErrorCode::SyntaxError(
                            "ASOF join needs at least one equi-join column",
                        ));
                    }
                    let inequality_type = key_types.pop().ok_or_else(|| {
                        ErrorCode::LogicalError("ASOF key tuple lost its inequality column")
                    })?;
                    if inequality_type.is_nullable() {
                        return Err(ErrorCode::NotImplemented(
                            "ASOF join over right table Nullable column is not implemented",
                        ));
                    }
                    let (ty, size) = AsofType::try_new(&inequality_type)?;
                    asof_type = Some(ty);
                    asof_size = Some(size);
                }

                let (current_method, mut sizes) = choose_hash_method_with_types(&key_types)?;
                if let Some(size) = asof_size {
                    // The inequality column is measured but never hashed.
                    sizes.push(size);
                }
                key_sizes.push(sizes);

                method = match method {
                    None => Some(current_method),
                    Some(chosen) if chosen.name() == current_method.name() => Some(chosen),
                    Some(_) => Some(HashMethodKind::Serializer(Default::default())),
                };
            }
        }

        let saved_block_sample = Self::init_right_block_structure(
            &desc,
            &right_table_keys,
            &sample_block_with_columns_to_add,
            multiple_disjuncts,
        );

        if desc.nullable_right_side {
            sample_block_with_columns_to_add =
                crate::common::wrap_nullable_block(&sample_block_with_columns_to_add);
        }

        let maps = match (&method, desc.kind, &desc.dictionary_reader) {
            (_, JoinKind::Cross, _) => Vec::new(),
            (_, _, Some(_)) => Vec::new(),
            (Some(method), _, None) => desc
                .key_names_right
                .iter()
                .map(|_| JoinMaps::create(maps_kind, method))
                .collect(),
            (None, _, None) => {
                return Err(ErrorCode::LogicalError("hash join method was not chosen"))
            }
        };

        debug!(
            "hash join created: kind {}, strictness {}, method {}, disjuncts {}",
            desc.kind,
            desc.strictness,
            method.as_ref().map(|m| m.name()).unwrap_or("Cross"),
            desc.key_names_right.len(),
        );

        Ok(HashJoin {
            any_take_last_row,
            method,
            need_flags,
            key_sizes,
            asof_type,
            right_table_keys,
            sample_block_with_columns_to_add,
            required_right_keys,
            data: Arc::new(RwLock::new(RightTableData {
                row_space: RowSpace::new(saved_block_sample),
                maps,
            })),
            used_flags: RwLock::new(JoinUsedFlags::new(need_flags)),
            sealed: AtomicBool::new(false),
            totals: RwLock::new(None),
            desc,
        })
    }

    fn split_additional_columns(
        desc: &HashJoinDesc,
        right_sample_block: &DataBlock,
    ) -> Result<(DataBlock, DataBlock)> {
        let key_names = &desc.key_names_right[0];
        let mut keys = DataBlock::empty();
        for name in key_names {
            let entry = right_sample_block.get_by_name(name).ok_or_else(|| {
                ErrorCode::NoSuchColumnInTable(format!(
                    "not found column {} in the right table",
                    name
                ))
            })?;
            keys.add_entry(entry.clone());
        }
        let mut columns_to_add = DataBlock::empty();
        for entry in right_sample_block.entries() {
            if !key_names.contains(&entry.name) {
                columns_to_add.add_entry(entry.clone());
            }
        }
        Ok((keys, columns_to_add))
    }

    /// Decide which right columns the storage keeps (the "saved block
    /// sample"): key columns only when something downstream can ask for
    /// them, the ASOF inequality key, and always the payload columns.
    fn init_right_block_structure(
        desc: &HashJoinDesc,
        right_table_keys: &DataBlock,
        sample_block_with_columns_to_add: &DataBlock,
        multiple_disjuncts: bool,
    ) -> DataBlock {
        let mut saved = DataBlock::empty();
        let save_key_columns =
            !desc.force_hash_join || desc.kind.is_right_or_full() || multiple_disjuncts;
        if save_key_columns {
            saved = right_table_keys.clone_empty();
        } else if desc.strictness == JoinStrictness::Asof {
            if let Some(entry) = right_table_keys.entries().last() {
                saved.add_entry(entry.clone());
            }
        }
        for entry in sample_block_with_columns_to_add.entries() {
            if saved.get_by_name(&entry.name).is_none() {
                saved.add_entry(entry.clone());
            }
        }
        if desc.nullable_right_side {
            saved = crate::common::wrap_nullable_block(&saved);
        }
        saved.clone_empty()
    }

    /// Rearrange an input block into the saved-sample layout, widening to
    /// nullable where the sample demands it.
    fn structure_right_block(&self, block: &DataBlock, saved_sample: &DataBlock) -> Result<DataBlock> {
        let mut structured = DataBlock::empty();
        for sample_entry in saved_sample.entries() {
            let entry = block.get_by_name(&sample_entry.name).ok_or_else(|| {
                ErrorCode::NoSuchColumnInTable(format!(
                    "not found column {} in the right block",
                    sample_entry.name
                ))
            })?;
            let mut column = entry.to_column(block.num_rows());
            if sample_entry.data_type.is_nullable() {
                column = column.wrap_nullable(None);
            }
            structured.add_entry(BlockEntry::new(
                sample_entry.name.clone(),
                column.data_type(),
                Value::Column(column),
            ));
        }
        Ok(structured)
    }

    pub fn over_dictionary(&self) -> bool {
        self.desc.dictionary_reader.is_some()
    }

    /// The chosen keyed representation, `None` for cross joins.
    pub fn hash_method(&self) -> Option<&HashMethodKind> {
        self.method.as_ref()
    }

    /// Per-disjunct fixed byte widths of the key columns, including the
    /// ASOF inequality width where applicable.
    pub fn key_sizes(&self) -> &[Vec<usize>] {
        &self.key_sizes
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().row_space.is_empty()
    }

    pub fn always_returns_empty_set(&self) -> bool {
        self.desc.kind.is_inner_or_right() && self.is_empty() && !self.over_dictionary()
    }

    pub fn total_rows(&self) -> u64 {
        self.data.read().row_space.row_count as u64
    }

    pub fn total_bytes(&self) -> u64 {
        let data = self.data.read();
        let maps_bytes: usize = data.maps.iter().map(|maps| maps.bytes_len()).sum();
        (data.row_space.bytes() + maps_bytes) as u64
    }

    /// Materialize and index one right block. Returns `Ok(false)` when a
    /// `Break`-mode size limit was crossed.
    pub fn add_right_block(&self, source_block: &DataBlock, check_limits: bool) -> Result<bool> {
        if self.sealed.load(Ordering::Acquire) {
            return Err(ErrorCode::LogicalError(
                "add_right_block called after the hash join was sealed for probing",
            ));
        }
        if self.over_dictionary() {
            return Err(ErrorCode::LogicalError(
                "insert into a hash join over a dictionary",
            ));
        }
        // Row references store the row index in 32 bits; block splitting
        // would be dead code, so bigger blocks are rejected outright.
        if source_block.num_rows() > u32::MAX as usize {
            return Err(ErrorCode::NotImplemented(format!(
                "too many rows in right table block for hash join: {}",
                source_block.num_rows()
            )));
        }

        let block = source_block.convert_to_full();
        let rows = block.num_rows();
        trace!("add right block: {} rows", rows);

        // Ordered union of the key names across disjuncts, plus the
        // positions of each disjunct's keys inside the union.
        let mut all_key_names_right: Vec<String> = Vec::new();
        let mut key_indexes: Vec<Vec<usize>> = Vec::new();
        for key_names in &self.desc.key_names_right {
            let mut indexes = Vec::with_capacity(key_names.len());
            for name in key_names {
                match all_key_names_right.iter().position(|n| n == name) {
                    Some(index) => indexes.push(index),
                    None => {
                        indexes.push(all_key_names_right.len());
                        all_key_names_right.push(name.clone());
                    }
                }
            }
            key_indexes.push(indexes);
        }
        let all_key_columns = materialize_keys(&block, &all_key_names_right)?;

        let mut data = self.data.write();
        let data = &mut *data;
        let structured_block =
            self.structure_right_block(&block, &data.row_space.saved_block_sample)?;
        let chunk_index = data.row_space.push_block(structured_block)?;

        let mut save_a_nullmap = false;
        let mut used_flags = self.used_flags.write();
        for (d, indexes) in key_indexes.iter().enumerate() {
            if self.desc.kind == JoinKind::Cross {
                break;
            }
            let key_columns: Vec<Column> = indexes
                .iter()
                .map(|index| all_key_columns[*index].clone())
                .collect();
            let (key_columns, null_map) = extract_nested_columns_and_null_map(key_columns);

            if self.desc.kind.is_right_or_full() {
                if let Some(null_map) = &null_map {
                    save_a_nullmap |= null_map.iter().any(|byte| *byte != 0);
                }
            }

            let (key_columns, asof_column) = if self.desc.strictness == JoinStrictness::Asof {
                let mut key_columns = key_columns;
                let asof_column = key_columns.pop().ok_or_else(|| {
                    ErrorCode::LogicalError("ASOF key tuple lost its inequality column")
                })?;
                (key_columns, Some(asof_column))
            } else {
                (key_columns, None)
            };

            let maps = data.maps.get_mut(d).ok_or_else(|| {
                ErrorCode::LogicalError("hash join maps were not initialized for this disjunct")
            })?;
            match maps {
                JoinMaps::One(table) => insert_one(
                    table,
                    &key_columns,
                    rows,
                    chunk_index,
                    null_map.as_deref(),
                    self.any_take_last_row,
                )?,
                JoinMaps::All(table) => insert_all(
                    table,
                    &key_columns,
                    rows,
                    chunk_index,
                    null_map.as_deref(),
                    &data.row_space.pool,
                )?,
                JoinMaps::Asof(table) => {
                    let asof_column = asof_column.ok_or_else(|| {
                        ErrorCode::LogicalError("ASOF maps without an inequality column")
                    })?;
                    let asof_type = self.asof_type.ok_or_else(|| {
                        ErrorCode::LogicalError("ASOF maps without a resolved ASOF type")
                    })?;
                    insert_asof(
                        table,
                        &key_columns,
                        &asof_column,
                        rows,
                        chunk_index,
                        null_map.as_deref(),
                        asof_type,
                    )?
                }
            }

            // One flag per bucket plus the zero-storage slot.
            used_flags.reinit(d, data.maps[d].entry_count() + 1);
        }
        drop(used_flags);

        if save_a_nullmap {
            let (_, null_map) = extract_nested_columns_and_null_map(all_key_columns);
            if let Some(null_map) = null_map {
                data.row_space.blocks_nullmaps.push((chunk_index, null_map));
            }
        }

        if !check_limits {
            return Ok(true);
        }
        let total_rows = data.row_space.row_count as u64;
        let maps_bytes: usize = data.maps.iter().map(|maps| maps.bytes_len()).sum();
        let total_bytes = (data.row_space.bytes() + maps_bytes) as u64;
        self.desc.size_limits.check(total_rows, total_bytes, "JOIN")
    }

    /// Share the sealed right-side state of another instance. The donor
    /// must not receive further `add_right_block` calls.
    pub fn reuse_joined_data(&mut self, other: &HashJoin) -> Result<()> {
        other.sealed.store(true, Ordering::Release);
        self.data = Arc::clone(&other.data);
        let data = self.data.read();
        let mut used_flags = self.used_flags.write();
        for (d, maps) in data.maps.iter().enumerate() {
            used_flags.reinit(d, maps.entry_count() + 1);
        }
        Ok(())
    }

    pub fn set_totals(&self, block: DataBlock) {
        *self.totals.write() = Some(block);
    }

    /// Merge the right-side totals into a one-row totals block, defaulting
    /// the columns-to-add when no right totals were set.
    pub fn join_totals(&self, block: &mut DataBlock) -> Result<()> {
        let totals = self.totals.read();
        for entry in self.sample_block_with_columns_to_add.entries() {
            if block.get_by_name(&entry.name).is_some() {
                continue;
            }
            let column = match totals.as_ref().and_then(|t| t.get_by_name(&entry.name)) {
                Some(total_entry) => total_entry.to_column(1),
                None => default_column(&entry.data_type, 1),
            };
            block.add_entry(BlockEntry::new(
                entry.name.clone(),
                column.data_type(),
                Value::Column(column),
            ));
        }
        Ok(())
    }

    /// Verify a `join_get` call shape and resolve its result type.
    pub fn join_get_return_type(
        &self,
        data_types: &[DataType],
        column_name: &str,
        or_null: bool,
    ) -> Result<DataType> {
        if self.right_table_keys.num_columns() != data_types.len() {
            return Err(ErrorCode::NumberOfArgumentsDoesntMatch(format!(
                "number of arguments for join_get does not match: passed {}, should be {}",
                data_types.len(),
                self.right_table_keys.num_columns()
            )));
        }
        for (i, left_type) in data_types.iter().enumerate() {
            let right = self.right_table_keys.entry(i);
            if left_type.remove_nullable() != right.data_type.remove_nullable() {
                return Err(ErrorCode::TypeMismatch(format!(
                    "type mismatch in join_get key {}: found type {}, while the needed type is {}",
                    i, left_type, right.data_type
                )));
            }
        }
        let entry = self
            .sample_block_with_columns_to_add
            .get_by_name(column_name)
            .ok_or_else(|| {
                ErrorCode::NoSuchColumnInTable(format!(
                    "join storage does not contain column {}",
                    column_name
                ))
            })?;
        let ty = entry.data_type.clone();
        Ok(if or_null { ty.wrap_nullable() } else { ty })
    }

    /// Point lookup into the build side: for every key row return the
    /// payload column value of the matching right row, or a default.
    ///
    /// Read-only after seal; only LEFT ANY / LEFT RightAny instances, whose
    /// shapes never allocate used-flags, support it.
    pub fn join_get(
        &self,
        block: &DataBlock,
        column_name: &str,
        or_null: bool,
    ) -> Result<BlockEntry> {
        let valid = matches!(
            self.desc.strictness,
            JoinStrictness::Any | JoinStrictness::RightAny
        ) && self.desc.kind == JoinKind::Left;
        if !valid {
            return Err(ErrorCode::IncompatibleTypeOfJoin(
                "join_get only supports joins of type LEFT ANY",
            ));
        }
        if self.over_dictionary() {
            return Err(ErrorCode::NotImplemented(
                "join_get over a dictionary-backed join",
            ));
        }
        if self.used_flags.read().need_flags() {
            return Err(ErrorCode::LogicalError(
                "join_get is not protected from hash table changes between blocks",
            ));
        }
        if block.num_columns() != self.desc.key_names_right[0].len() {
            return Err(ErrorCode::NumberOfArgumentsDoesntMatch(format!(
                "number of key columns for join_get does not match: passed {}, should be {}",
                block.num_columns(),
                self.desc.key_names_right[0].len()
            )));
        }

        self.sealed.store(true, Ordering::Release);

        // Reassemble the key block under the right-side key names.
        let mut keys = DataBlock::empty();
        for (i, entry) in block.entries().iter().enumerate() {
            keys.add_entry(BlockEntry::new(
                self.desc.key_names_right[0][i].clone(),
                entry.data_type.clone(),
                entry.value.clone(),
            ));
        }
        let keys_rows = block.num_rows();
        let mut keys = DataBlock::new(keys.entries().to_vec(), keys_rows).convert_to_full();

        let target = self.join_get_return_type(
            &block
                .entries()
                .iter()
                .map(|entry| entry.data_type.clone())
                .collect::<Vec<_>>(),
            column_name,
            or_null,
        )?;
        let sample_entry = self
            .sample_block_with_columns_to_add
            .get_by_name(column_name)
            .ok_or_else(|| {
                ErrorCode::NoSuchColumnInTable(format!(
                    "join storage does not contain column {}",
                    column_name
                ))
            })?;
        let mut columns_to_add = DataBlock::empty();
        columns_to_add.add_entry(BlockEntry::new(
            sample_entry.name.clone(),
            target.clone(),
            sample_entry.value.clone(),
        ));

        let features = JoinFeatures::new(JoinKind::Left, JoinStrictness::Any, false);
        let data = self.data.read();
        let key_names = vec![self.desc.key_names_right[0].clone()];
        self.probe_block(&data, &mut keys, features, &columns_to_add, &key_names)?;

        keys.entries()
            .last()
            .cloned()
            .ok_or_else(|| ErrorCode::LogicalError("join_get produced no result column"))
    }

    /// Stream of right rows never marked used, for Right/Full shapes.
    pub fn create_non_joined_stream(
        &self,
        result_sample_block: DataBlock,
        max_block_size: usize,
    ) -> Option<NonJoinedBlockStream<'_>> {
        if matches!(
            self.desc.strictness,
            JoinStrictness::Asof | JoinStrictness::Semi
        ) {
            return None;
        }
        if !self.desc.kind.is_right_or_full() {
            return None;
        }
        debug!(
            "non-joined stream created: kind {}, strictness {}",
            self.desc.kind, self.desc.strictness
        );
        Some(NonJoinedBlockStream::new(
            self,
            result_sample_block,
            max_block_size,
        ))
    }
}

fn insert_one(
    table: &mut HashJoinHashTable<RowPtr>,
    key_columns: &[Column],
    rows: usize,
    chunk_index: u32,
    null_map: Option<&[u8]>,
    any_take_last_row: bool,
) -> Result<()> {
    macro_rules! insert_fixed_key {
        ($table:expr) => {{
            let keys = $table.hash_method.build_keys(key_columns, rows)?;
            for row in 0..rows {
                if let Some(null_map) = null_map {
                    if null_map[row] != 0 {
                        continue;
                    }
                }
                let ptr = RowPtr::new(chunk_index, row as u32);
                let (inserted, _, value) = $table.hash_table.emplace(keys[row], || ptr);
                if !inserted && any_take_last_row {
                    *value = ptr;
                }
            }
        }};
    }
    macro_rules! insert_string_key {
        ($table:expr) => {{
            let keys = $table.hash_method.build_keys(&key_columns[0], rows)?;
            for row in 0..rows {
                if let Some(null_map) = null_map {
                    if null_map[row] != 0 {
                        continue;
                    }
                }
                let ptr = RowPtr::new(chunk_index, row as u32);
                let (inserted, _, value) = $table.hash_table.emplace(keys[row], || ptr);
                if !inserted && any_take_last_row {
                    *value = ptr;
                }
            }
        }};
    }

    match table {
        HashJoinHashTable::Serializer(t) => insert_fixed_key!(t),
        HashJoinHashTable::SingleString(t) => insert_string_key!(t),
        HashJoinHashTable::SingleFixedString(t) => insert_string_key!(t),
        HashJoinHashTable::KeysU8(t) => insert_fixed_key!(t),
        HashJoinHashTable::KeysU16(t) => insert_fixed_key!(t),
        HashJoinHashTable::KeysU32(t) => insert_fixed_key!(t),
        HashJoinHashTable::KeysU64(t) => insert_fixed_key!(t),
        HashJoinHashTable::KeysU128(t) => insert_fixed_key!(t),
        HashJoinHashTable::KeysU256(t) => insert_fixed_key!(t),
        HashJoinHashTable::Null => {
            return Err(ErrorCode::LogicalError(
                "insert into an uninitialized hash join table",
            ))
        }
    }
    Ok(())
}

fn insert_all(
    table: &mut HashJoinHashTable<RowRefList>,
    key_columns: &[Column],
    rows: usize,
    chunk_index: u32,
    null_map: Option<&[u8]>,
    pool: &crate::row::Pool,
) -> Result<()> {
    macro_rules! insert_fixed_key {
        ($table:expr) => {{
            let keys = $table.hash_method.build_keys(key_columns, rows)?;
            for row in 0..rows {
                if let Some(null_map) = null_map {
                    if null_map[row] != 0 {
                        continue;
                    }
                }
                let ptr = RowPtr::new(chunk_index, row as u32);
                let (inserted, _, value) =
                    $table.hash_table.emplace(keys[row], || RowRefList::new(ptr));
                if !inserted {
                    // The head stays in the table; the rest go to the pool.
                    value.insert(ptr, pool);
                }
            }
        }};
    }
    macro_rules! insert_string_key {
        ($table:expr) => {{
            let keys = $table.hash_method.build_keys(&key_columns[0], rows)?;
            for row in 0..rows {
                if let Some(null_map) = null_map {
                    if null_map[row] != 0 {
                        continue;
                    }
                }
                let ptr = RowPtr::new(chunk_index, row as u32);
                let (inserted, _, value) =
                    $table.hash_table.emplace(keys[row], || RowRefList::new(ptr));
                if !inserted {
                    value.insert(ptr, pool);
                }
            }
        }};
    }

    match table {
        HashJoinHashTable::Serializer(t) => insert_fixed_key!(t),
        HashJoinHashTable::SingleString(t) => insert_string_key!(t),
        HashJoinHashTable::SingleFixedString(t) => insert_string_key!(t),
        HashJoinHashTable::KeysU8(t) => insert_fixed_key!(t),
        HashJoinHashTable::KeysU16(t) => insert_fixed_key!(t),
        HashJoinHashTable::KeysU32(t) => insert_fixed_key!(t),
        HashJoinHashTable::KeysU64(t) => insert_fixed_key!(t),
        HashJoinHashTable::KeysU128(t) => insert_fixed_key!(t),
        HashJoinHashTable::KeysU256(t) => insert_fixed_key!(t),
        HashJoinHashTable::Null => {
            return Err(ErrorCode::LogicalError(
                "insert into an uninitialized hash join table",
            ))
        }
    }
    Ok(())
}

fn insert_asof(
    table: &mut HashJoinHashTable<AsofRowRefs>,
    key_columns: &[Column],
    asof_column: &Column,
    rows: usize,
    chunk_index: u32,
    null_map: Option<&[u8]>,
    asof_type: AsofType,
) -> Result<()> {
    macro_rules! insert_fixed_key {
        ($table:expr) => {{
            let keys = $table.hash_method.build_keys(key_columns, rows)?;
            for row in 0..rows {
                if let Some(null_map) = null_map {
                    if null_map[row] != 0 {
                        continue;
                    }
                }
                let ptr = RowPtr::new(chunk_index, row as u32);
                let (_, _, value) = $table
                    .hash_table
                    .emplace(keys[row], || AsofRowRefs::new(asof_type));
                value.insert(asof_column, row, ptr)?;
            }
        }};
    }
    macro_rules! insert_string_key {
        ($table:expr) => {{
            let keys = $table.hash_method.build_keys(&key_columns[0], rows)?;
            for row in 0..rows {
                if let Some(null_map) = null_map {
                    if null_map[row] != 0 {
                        continue;
                    }
                }
                let ptr = RowPtr::new(chunk_index, row as u32);
                let (_, _, value) = $table
                    .hash_table
                    .emplace(keys[row], || AsofRowRefs::new(asof_type));
                value.insert(asof_column, row, ptr)?;
            }
        }};
    }

    match table {
        HashJoinHashTable::Serializer(t) => insert_fixed_key!(t),
        HashJoinHashTable::SingleString(t) => insert_string_key!(t),
        HashJoinHashTable::SingleFixedString(t) => insert_string_key!(t),
        HashJoinHashTable::KeysU8(t) => insert_fixed_key!(t),
        HashJoinHashTable::KeysU16(t) => insert_fixed_key!(t),
        HashJoinHashTable::KeysU32(t) => insert_fixed_key!(t),
        HashJoinHashTable::KeysU64(t) => insert_fixed_key!(t),
        HashJoinHashTable::KeysU128(t) => insert_fixed_key!(t),
        HashJoinHashTable::KeysU256(t) => insert_fixed_key!(t),
        HashJoinHashTable::Null => {
            return Err(ErrorCode::LogicalError(
                "insert into an uninitialized hash join table",
            ))
        }
    }
    Ok(())
}
