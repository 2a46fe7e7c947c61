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

use std::sync::atomic::Ordering;

use quarry_common_exception::ErrorCode;
use quarry_common_exception::Result;
use quarry_common_expression::BlockEntry;
use quarry_common_expression::Column;
use quarry_common_expression::DataBlock;
use quarry_common_expression::Value;
use quarry_common_hashtable::HashJoinHashtableLike;
use quarry_common_hashtable::RowPtr;

use crate::added_columns::AddedColumns;
use crate::added_columns::KnownRowsHolder;
use crate::common::check_types_of_keys;
use crate::common::correct_nullability;
use crate::common::correct_nullability_with_null_map;
use crate::common::extract_nested_columns_and_null_map;
use crate::common::filter_with_blanks;
use crate::common::materialize_keys;
use crate::common::wrap_nullable_block;
use crate::cross_join::NotProcessedCrossJoin;
use crate::desc::AsofInequality;
use crate::desc::JoinKind;
use crate::desc::JoinStrictness;
use crate::hash_join::HashJoin;
use crate::hash_join::RightTableData;
use crate::join_hash_table::HashJoinHashTable;
use crate::join_hash_table::JoinMaps;
use crate::row::JoinMapped;
use crate::used_flags::JoinUsedFlags;

/// The boolean shape of a probe, derived once per invocation from the
/// join kind and strictness.
#[derive(Clone, Copy)]
pub(crate) struct JoinFeatures {
    pub is_any_join: bool,
    pub is_all_join: bool,
    pub is_asof_join: bool,
    pub is_semi_join: bool,
    pub is_anti_join: bool,
    pub left: bool,
    pub right: bool,
    pub inner: bool,
    /// Left columns are replicated by cumulative offsets to align with an
    /// expanded right side.
    pub need_replication: bool,
    /// Left columns are filtered down to the matched (or, for ANTI,
    /// unmatched) rows.
    pub need_filter: bool,
    /// Left rows without a match still emit a row with default right
    /// columns.
    pub add_missing: bool,
    pub need_flags: bool,
}

impl JoinFeatures {
    pub fn new(kind: JoinKind, strictness: JoinStrictness, need_flags: bool) -> JoinFeatures {
        let is_any_join = strictness == JoinStrictness::Any;
        let is_all_join = strictness == JoinStrictness::All;
        let is_asof_join = strictness == JoinStrictness::Asof;
        let is_semi_join = strictness == JoinStrictness::Semi;
        let is_anti_join = strictness == JoinStrictness::Anti;
        let left = kind == JoinKind::Left;
        let right = kind == JoinKind::Right;
        let inner = kind == JoinKind::Inner;
        let full = kind == JoinKind::Full;
        let need_replication = is_all_join || (is_any_join && right) || (is_semi_join && right);
        let need_filter = !need_replication
            && (inner || right || (is_semi_join && left) || (is_anti_join && left));
        let add_missing = (left || full) && !is_semi_join;
        JoinFeatures {
            is_any_join,
            is_all_join,
            is_asof_join,
            is_semi_join,
            is_anti_join,
            left,
            right,
            inner,
            need_replication,
            need_filter,
            add_missing,
            need_flags,
        }
    }
}

struct ProbeContext<'a> {
    features: JoinFeatures,
    used_flags: &'a JoinUsedFlags,
    multiple_disjuncts: bool,
    asof_inequality: AsofInequality,
    left_asof_key: Option<&'a Column>,
}

/// Random access to the per-row probe keys of one disjunct.
trait KeyAccessor {
    type Key: ?Sized;
    fn key_at(&self, row: usize) -> &Self::Key;
}

struct FixedKeys<K>(Vec<K>);

impl<K> KeyAccessor for FixedKeys<K> {
    type Key = K;

    #[inline(always)]
    fn key_at(&self, row: usize) -> &K {
        &self.0[row]
    }
}

struct SliceKeys<'a>(Vec<&'a [u8]>);

impl KeyAccessor for SliceKeys<'_> {
    type Key = [u8];

    #[inline(always)]
    fn key_at(&self, row: usize) -> &[u8] {
        self.0[row]
    }
}

impl HashJoin {
    /// Join one left block in place. Cross joins may park a continuation
    /// in `not_processed` when the output cap is crossed.
    pub fn join_block(
        &self,
        block: &mut DataBlock,
        not_processed: &mut Option<NotProcessedCrossJoin>,
    ) -> Result<()> {
        self.sealed.store(true, Ordering::Release);

        if self.desc.kind == JoinKind::Cross {
            return self.join_block_impl_cross(block, not_processed);
        }

        *block = block.convert_to_full();
        if self.desc.kind.is_right_or_full() && self.desc.nullable_left_side {
            *block = wrap_nullable_block(block);
        }

        for (left_names, right_names) in self
            .desc
            .key_names_left
            .iter()
            .zip(self.desc.key_names_right.iter())
        {
            check_types_of_keys(block, left_names, &self.right_table_keys, right_names)?;
        }

        let features = JoinFeatures::new(self.desc.kind, self.desc.strictness, self.need_flags);
        let data = self.data.read();
        self.probe_block(
            &data,
            block,
            features,
            &self.sample_block_with_columns_to_add,
            &self.desc.key_names_left,
        )
    }

    /// The common probe pipeline: materialize per-disjunct keys, run the
    /// row loop, then filter / substitute keys / replicate.
    pub(crate) fn probe_block(
        &self,
        data: &RightTableData,
        block: &mut DataBlock,
        features: JoinFeatures,
        block_with_columns_to_add: &DataBlock,
        key_names_left: &[Vec<String>],
    ) -> Result<()> {
        let rows = block.num_rows();
        let multiple_disjuncts = key_names_left.len() > 1;

        let mut key_columns_vec = Vec::with_capacity(key_names_left.len());
        let mut null_maps = Vec::with_capacity(key_names_left.len());
        for key_names in key_names_left {
            let columns = materialize_keys(block, key_names)?;
            let (columns, null_map) = extract_nested_columns_and_null_map(columns);
            key_columns_vec.push(columns);
            null_maps.push(null_map);
        }

        let left_asof_column = if features.is_asof_join {
            Some(key_columns_vec[0].pop().ok_or_else(|| {
                ErrorCode::LogicalError("ASOF probe lost its inequality column")
            })?)
        } else {
            None
        };
        let right_asof_entry = if features.is_asof_join {
            self.right_table_keys.entries().last()
        } else {
            None
        };

        let dictionary_result = match &self.desc.dictionary_reader {
            Some(reader) => {
                let key_column = key_columns_vec[0].first().ok_or_else(|| {
                    ErrorCode::LogicalError("dictionary join without a key column")
                })?;
                Some(reader.read_keys(key_column)?)
            }
            None => None,
        };
        let (saved_sample, right_blocks): (&DataBlock, &[DataBlock]) = match &dictionary_result {
            Some((read_block, _, _)) => (read_block, std::slice::from_ref(read_block)),
            None => (&data.row_space.saved_block_sample, &data.row_space.blocks),
        };

        let existing_columns = block.num_columns();
        let mut added = AddedColumns::new(
            block_with_columns_to_add,
            block,
            saved_sample,
            right_blocks,
            right_asof_entry,
            rows,
        )?;
        added.need_filter = features.need_filter || !self.required_right_keys.is_empty();

        let used_flags = self.used_flags.read();
        debug_assert_eq!(features.need_flags, used_flags.need_flags());
        let context = ProbeContext {
            features,
            used_flags: &used_flags,
            multiple_disjuncts,
            asof_inequality: self.desc.asof_inequality,
            left_asof_key: left_asof_column.as_ref(),
        };

        let row_filter = match &dictionary_result {
            Some((_, found, positions)) => dictionary_join_right_columns(
                &mut added,
                found,
                positions,
                null_maps[0].as_deref(),
                &context,
            )?,
            None => self.switch_join_right_columns(
                data,
                &key_columns_vec,
                &null_maps,
                &mut added,
                &context,
            )?,
        };
        drop(used_flags);

        let offsets_to_replicate = added.offsets_to_replicate.take();
        let added_entries = added.move_columns();

        self.finish_join_block(
            block,
            existing_columns,
            added_entries,
            row_filter,
            offsets_to_replicate,
            features,
        )
    }

    fn switch_join_right_columns(
        &self,
        data: &RightTableData,
        key_columns_vec: &[Vec<Column>],
        null_maps: &[Option<Vec<u8>>],
        added: &mut AddedColumns,
        context: &ProbeContext,
    ) -> Result<Vec<u8>> {
        match data.maps.first() {
            None => Err(ErrorCode::LogicalError(
                "probe of a hash join without initialized maps",
            )),
            Some(JoinMaps::One(_)) => {
                let mut maps = Vec::with_capacity(key_columns_vec.len());
                for d in 0..key_columns_vec.len() {
                    match data.maps.get(d) {
                        Some(JoinMaps::One(table)) => maps.push(table),
                        _ => {
                            return Err(ErrorCode::LogicalError(
                                "join maps disagree across disjuncts",
                            ))
                        }
                    }
                }
                self.switch_key_method(&maps, key_columns_vec, null_maps, added, context)
            }
            Some(JoinMaps::All(_)) => {
                let mut maps = Vec::with_capacity(key_columns_vec.len());
                for d in 0..key_columns_vec.len() {
                    match data.maps.get(d) {
                        Some(JoinMaps::All(table)) => maps.push(table),
                        _ => {
                            return Err(ErrorCode::LogicalError(
                                "join maps disagree across disjuncts",
                            ))
                        }
                    }
                }
                self.switch_key_method(&maps, key_columns_vec, null_maps, added, context)
            }
            Some(JoinMaps::Asof(_)) => {
                let mut maps = Vec::with_capacity(key_columns_vec.len());
                for d in 0..key_columns_vec.len() {
                    match data.maps.get(d) {
                        Some(JoinMaps::Asof(table)) => maps.push(table),
                        _ => {
                            return Err(ErrorCode::LogicalError(
                                "join maps disagree across disjuncts",
                            ))
                        }
                    }
                }
                self.switch_key_method(&maps, key_columns_vec, null_maps, added, context)
            }
        }
    }

    fn switch_key_method<V: JoinMapped>(
        &self,
        maps: &[&HashJoinHashTable<V>],
        key_columns_vec: &[Vec<Column>],
        null_maps: &[Option<Vec<u8>>],
        added: &mut AddedColumns,
        context: &ProbeContext,
    ) -> Result<Vec<u8>> {
        let rows = added.rows_to_add;

        macro_rules! probe_fixed_key {
            ($variant:ident) => {{
                let mut tables = Vec::with_capacity(maps.len());
                let mut keys = Vec::with_capacity(maps.len());
                for (d, map) in maps.iter().enumerate() {
                    match map {
                        HashJoinHashTable::$variant(t) => {
                            keys.push(FixedKeys(
                                t.hash_method.build_keys(&key_columns_vec[d], rows)?,
                            ));
                            tables.push(&t.hash_table);
                        }
                        _ => {
                            return Err(ErrorCode::LogicalError(
                                "join hash tables disagree across disjuncts",
                            ))
                        }
                    }
                }
                join_right_columns(&tables, &keys, null_maps, added, context)
            }};
        }
        macro_rules! probe_string_key {
            ($variant:ident) => {{
                let mut tables = Vec::with_capacity(maps.len());
                let mut keys = Vec::with_capacity(maps.len());
                for (d, map) in maps.iter().enumerate() {
                    match map {
                        HashJoinHashTable::$variant(t) => {
                            keys.push(SliceKeys(
                                t.hash_method.build_keys(&key_columns_vec[d][0], rows)?,
                            ));
                            tables.push(&t.hash_table);
                        }
                        _ => {
                            return Err(ErrorCode::LogicalError(
                                "join hash tables disagree across disjuncts",
                            ))
                        }
                    }
                }
                join_right_columns(&tables, &keys, null_maps, added, context)
            }};
        }

        match maps[0] {
            HashJoinHashTable::Serializer(_) => probe_fixed_key!(Serializer),
            HashJoinHashTable::SingleString(_) => probe_string_key!(SingleString),
            HashJoinHashTable::SingleFixedString(_) => probe_string_key!(SingleFixedString),
            HashJoinHashTable::KeysU8(_) => probe_fixed_key!(KeysU8),
            HashJoinHashTable::KeysU16(_) => probe_fixed_key!(KeysU16),
            HashJoinHashTable::KeysU32(_) => probe_fixed_key!(KeysU32),
            HashJoinHashTable::KeysU64(_) => probe_fixed_key!(KeysU64),
            HashJoinHashTable::KeysU128(_) => probe_fixed_key!(KeysU128),
            HashJoinHashTable::KeysU256(_) => probe_fixed_key!(KeysU256),
            HashJoinHashTable::Null => Err(ErrorCode::UnsupportedJoinKeys(
                "unsupported join keys: the hash table was never initialized",
            )),
        }
    }

    /// Post-processing of the probed block: filter the left columns or
    /// replicate them by offsets, and substitute required right keys from
    /// the left keys (equality justifies the substitution).
    fn finish_join_block(
        &self,
        block: &mut DataBlock,
        existing_columns: usize,
        added_entries: Vec<BlockEntry>,
        row_filter: Vec<u8>,
        offsets_to_replicate: Option<Vec<u64>>,
        features: JoinFeatures,
    ) -> Result<()> {
        let rows = block.num_rows();
        let mut entries = block.entries().to_vec();
        entries.extend(added_entries);

        let asof_right_key_name = if features.is_asof_join {
            self.desc.key_names_right[0].last().cloned()
        } else {
            None
        };

        let mut right_keys_to_replicate = Vec::new();
        if features.need_filter {
            for entry in entries.iter_mut().take(existing_columns) {
                let column = entry.to_column(rows).filter(&row_filter);
                entry.value = Value::Column(column);
            }
            // Add right key columns from the left table, as the key values
            // are equal on matched rows.
            for (right_name, left_name) in &self.required_right_keys {
                if entries.iter().any(|entry| &entry.name == right_name) {
                    continue;
                }
                if asof_right_key_name.as_deref() == Some(right_name.as_str()) {
                    continue;
                }
                let left_entry = entries
                    .iter()
                    .find(|entry| &entry.name == left_name)
                    .ok_or_else(|| {
                        ErrorCode::NoSuchColumnInTable(format!(
                            "not found column {} in block",
                            left_name
                        ))
                    })?;
                let column = left_entry.to_column(left_entry_rows(left_entry));
                let is_nullable = self.desc.nullable_right_side
                    || right_key_is_nullable(&self.right_table_keys, right_name);
                entries.push(correct_nullability(right_name, column, is_nullable));
            }
        } else if !self.required_right_keys.is_empty() {
            for (right_name, left_name) in &self.required_right_keys {
                if entries.iter().any(|entry| &entry.name == right_name) {
                    continue;
                }
                if asof_right_key_name.as_deref() == Some(right_name.as_str()) {
                    continue;
                }
                let left_entry = entries
                    .iter()
                    .find(|entry| &entry.name == left_name)
                    .ok_or_else(|| {
                        ErrorCode::NoSuchColumnInTable(format!(
                            "not found column {} in block",
                            left_name
                        ))
                    })?;
                let column = left_entry.to_column(rows);
                let thin_column = filter_with_blanks(&column, &row_filter, false);
                let is_nullable = self.desc.nullable_right_side
                    || right_key_is_nullable(&self.right_table_keys, right_name);
                let entry = correct_nullability_with_null_map(
                    right_name,
                    thin_column,
                    is_nullable,
                    &row_filter,
                );
                if features.need_replication {
                    right_keys_to_replicate.push(entries.len());
                }
                entries.push(entry);
            }
        }

        if features.need_replication {
            let offsets = offsets_to_replicate.ok_or_else(|| {
                ErrorCode::LogicalError("replicating join without offsets to replicate")
            })?;
            for entry in entries.iter_mut().take(existing_columns) {
                let column = entry.to_column(rows).replicate(&offsets);
                entry.value = Value::Column(column);
            }
            for position in right_keys_to_replicate {
                let entry = &mut entries[position];
                let column = entry.to_column(rows).replicate(&offsets);
                entry.value = Value::Column(column);
            }
        }

        let num_rows = entries
            .first()
            .and_then(|entry| entry.value.as_column())
            .map(|column| column.len())
            .unwrap_or(0);
        *block = DataBlock::new(entries, num_rows);
        Ok(())
    }
}

/// The per-row probe loop shared by every non-cross, non-dictionary shape.
///
/// For each left row the disjuncts are consulted in order; the shape flags
/// decide how matches are emitted and when the loop short-circuits. The
/// returned filter marks the rows the post-processing keeps (or, when only
/// required right keys asked for it, the rows that matched).
fn join_right_columns<H, A>(
    tables: &[&H],
    keys: &[A],
    null_maps: &[Option<Vec<u8>>],
    added: &mut AddedColumns,
    context: &ProbeContext,
) -> Result<Vec<u8>>
where
    H: HashJoinHashtableLike,
    H::Value: JoinMapped,
    A: KeyAccessor<Key = H::Key>,
{
    let rows = added.rows_to_add;
    let features = context.features;
    let need_filter = added.need_filter;
    let mut filter = if need_filter { vec![0u8; rows] } else { Vec::new() };
    if features.need_replication {
        added.offsets_to_replicate = Some(vec![0u64; rows]);
    }

    let disjunct_num = keys.len();
    let mut current_offset = 0u64;

    for i in 0..rows {
        let mut right_row_found = false;
        let mut null_element_found = false;
        let mut known_rows = KnownRowsHolder::new(context.multiple_disjuncts);

        let mut d = 0;
        'disjuncts: loop {
            'current: {
                if let Some(null_map) = null_maps[d].as_ref() {
                    if null_map[i] != 0 {
                        null_element_found = true;
                        break 'current;
                    }
                }
                let Some((offset, mapped)) = tables[d].find(keys[d].key_at(i)) else {
                    break 'current;
                };
                right_row_found = true;

                if features.is_asof_join {
                    let left_asof_key = context.left_asof_key.ok_or_else(|| {
                        ErrorCode::LogicalError("ASOF probe without a left inequality column")
                    })?;
                    match mapped.find_asof(context.asof_inequality, left_asof_key, i) {
                        Some(found) => {
                            if need_filter {
                                filter[i] = 1;
                            }
                            context.used_flags.set_used(d, offset);
                            added.append_from_block(found, features.add_missing)?;
                        }
                        None => add_not_found_row(added, &mut current_offset, features),
                    }
                } else if features.is_all_join {
                    if need_filter {
                        filter[i] = 1;
                    }
                    context.used_flags.set_used(d, offset);
                    add_found_row_all(
                        mapped,
                        added,
                        &mut current_offset,
                        &mut known_rows,
                        features.add_missing,
                        context.multiple_disjuncts,
                    )?;
                } else if (features.is_any_join || features.is_semi_join) && features.right {
                    // The first left row claiming the bucket emits its
                    // whole chain; concurrent probers race on the claim.
                    if context.used_flags.set_used_once(d, offset) {
                        if need_filter {
                            filter[i] = 1;
                        }
                        add_found_row_all(
                            mapped,
                            added,
                            &mut current_offset,
                            &mut known_rows,
                            features.add_missing,
                            context.multiple_disjuncts,
                        )?;
                    }
                } else if features.is_any_join && features.inner {
                    if context.used_flags.set_used_once(d, offset) {
                        if need_filter {
                            filter[i] = 1;
                        }
                        let head = head_row(mapped)?;
                        added.append_from_block(head, features.add_missing)?;
                    }
                    break 'disjuncts;
                } else if features.is_anti_join {
                    if features.right {
                        context.used_flags.set_used(d, offset);
                    }
                } else {
                    // ANY LEFT, SEMI LEFT and the legacy RightAny.
                    if need_filter {
                        filter[i] = 1;
                    }
                    context.used_flags.set_used(d, offset);
                    let head = head_row(mapped)?;
                    added.append_from_block(head, features.add_missing)?;
                    if features.is_any_join {
                        break 'disjuncts;
                    }
                }
            }

            d += 1;
            if !(context.multiple_disjuncts && d < disjunct_num) {
                break 'disjuncts;
            }
        }

        if !right_row_found && null_element_found {
            add_not_found_row(added, &mut current_offset, features);
            if let Some(offsets) = added.offsets_to_replicate.as_mut() {
                offsets[i] = current_offset;
            }
            continue;
        }

        if !right_row_found {
            if features.is_anti_join && features.left && need_filter {
                filter[i] = 1;
            }
            add_not_found_row(added, &mut current_offset, features);
        }

        if let Some(offsets) = added.offsets_to_replicate.as_mut() {
            offsets[i] = current_offset;
        }
    }

    added.apply_lazy_defaults();
    Ok(filter)
}

fn left_entry_rows(entry: &BlockEntry) -> usize {
    entry
        .value
        .as_column()
        .map(|column| column.len())
        .unwrap_or(0)
}

fn right_key_is_nullable(right_table_keys: &DataBlock, name: &str) -> bool {
    right_table_keys
        .get_by_name(name)
        .map(|entry| entry.data_type.is_nullable())
        .unwrap_or(false)
}

fn head_row<M: JoinMapped>(mapped: &M) -> Result<RowPtr> {
    mapped
        .head_row()
        .ok_or_else(|| ErrorCode::LogicalError("join mapped value has no head row"))
}

/// Append every row of a matched chain, deduplicating against rows already
/// emitted for this left row in the multi-disjunct regime.
fn add_found_row_all<M: JoinMapped>(
    mapped: &M,
    added: &mut AddedColumns,
    current_offset: &mut u64,
    known_rows: &mut KnownRowsHolder,
    add_missing: bool,
    multiple_disjuncts: bool,
) -> Result<()> {
    if add_missing {
        added.apply_lazy_defaults();
    }
    if multiple_disjuncts {
        let mut fresh = Vec::new();
        for ptr in mapped.rows() {
            if !known_rows.is_known(&ptr) {
                added.append_from_block(ptr, false)?;
                *current_offset += 1;
                fresh.push(ptr);
            }
        }
        known_rows.add(&fresh);
    } else {
        for ptr in mapped.rows() {
            added.append_from_block(ptr, false)?;
            *current_offset += 1;
        }
    }
    Ok(())
}

fn add_not_found_row(added: &mut AddedColumns, current_offset: &mut u64, features: JoinFeatures) {
    if features.add_missing {
        added.append_default_row();
        if features.need_replication {
            *current_offset += 1;
        }
    }
}

/// The dictionary probe: the injected reader resolves every key to at most
/// one right row, which the loop treats as a one-entry synthetic map.
fn dictionary_join_right_columns(
    added: &mut AddedColumns,
    found: &[u8],
    positions: &[u64],
    null_map: Option<&[u8]>,
    context: &ProbeContext,
) -> Result<Vec<u8>> {
    let rows = added.rows_to_add;
    let features = context.features;
    let need_filter = added.need_filter;
    let mut filter = if need_filter { vec![0u8; rows] } else { Vec::new() };

    for i in 0..rows {
        let mut right_row_found = false;
        let mut null_element_found = false;

        if let Some(null_map) = null_map {
            if null_map[i] != 0 {
                null_element_found = true;
            }
        }
        if !null_element_found && found.get(i).copied().unwrap_or(0) != 0 {
            right_row_found = true;
            if !features.is_anti_join {
                if need_filter {
                    filter[i] = 1;
                }
                let position = positions.get(i).copied().ok_or_else(|| {
                    ErrorCode::LogicalError("dictionary reader returned too few positions")
                })?;
                added.append_from_block(RowPtr::new(0, position as u32), features.add_missing)?;
            }
        }

        if !right_row_found {
            if features.is_anti_join && features.left && need_filter {
                filter[i] = 1;
            }
            if features.add_missing {
                added.append_default_row();
            }
        }
    }

    added.apply_lazy_defaults();
    Ok(filter)
}
