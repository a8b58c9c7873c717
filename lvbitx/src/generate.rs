//! Generation of LVBITX documents from descriptor records.
//!
//! The driver-side schema expects a fixed element sequence per node, so
//! every writer here emits its children in that exact order. Values come
//! straight from the descriptors; no semantic validation happens at this
//! level.

use std::io::Write;

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Local};

use crate::{
    encoding::{XmlStreamWriter, XmlWriteError},
    schema::bitfile::{Bitfile, DmaChannel, Icon, Register, RegisterBlock, RegisterDataType},
};

const TIMESTAMP_FORMAT: &str = "%m/%d/%Y%l:%M %p";

/// Generate an LVBITX document, stamped with the current local time.
pub fn generate_bitfile(bitfile: &Bitfile) -> Result<String, XmlWriteError> {
    generate_bitfile_at(bitfile, Local::now())
}

/// Generate an LVBITX document with the given timestamp.
///
/// The timestamp is the only non-deterministic input to generation;
/// callers that need reproducible output inject it here.
pub fn generate_bitfile_at(
    bitfile: &Bitfile,
    timestamp: DateTime<Local>,
) -> Result<String, XmlWriteError> {
    let mut out = Vec::new();
    let mut writer = XmlStreamWriter::new(&mut out);

    writer.write_declaration()?;
    writer.write_start("Bitfile")?;
    writer.write_text_element("BitfileVersion", "1.0")?;
    writer.write_text_element("SignatureRegister", &bitfile.signature_register)?;
    writer.write_text_element("SignatureGuids", &bitfile.signature_guids)?;
    writer.write_text_element("SignatureNames", &bitfile.signature_names)?;
    writer.write_text_element("TimeStamp", &timestamp.format(TIMESTAMP_FORMAT).to_string())?;
    writer.write_empty("CompilationStatus")?;
    writer.write_text_element("BitstreamVersion", "2")?;

    writer.write_start("VI")?;
    writer.write_text_element("Name", &bitfile.vi_name)?;
    writer.write_start("RegisterList")?;
    for register in &bitfile.registers {
        write_register(&mut writer, register)?;
    }
    writer.write_end("RegisterList")?;
    writer.write_end("VI")?;

    write_icon(&mut writer, &bitfile.icon)?;

    writer.write_start("Project")?;
    writer.write_text_element("TargetClass", &bitfile.target_class)?;
    writer.write_text_element(
        "AutoRunWhenDownloaded",
        bool_text(bitfile.auto_run_when_downloaded),
    )?;
    writer.write_start("CompilationResultsTree")?;
    writer.write_start("CompilationResults")?;
    writer.write_start("NiFlexRio")?;
    writer.write_start("Puma2")?;
    writer.write_text_element("BitstreamVersion", "2")?;
    writer.write_end("Puma2")?;
    writer.write_end("NiFlexRio")?;
    writer.write_start("NiFpga")?;
    writer.write_start("DmaChannelAllocationList")?;
    for channel in &bitfile.channels {
        write_channel(&mut writer, channel)?;
    }
    writer.write_end("DmaChannelAllocationList")?;
    writer.write_start("RegisterBlockList")?;
    for block in &bitfile.register_blocks {
        write_register_block(&mut writer, block)?;
    }
    writer.write_end("RegisterBlockList")?;
    writer.write_start("UsedBaseClockList")?;
    for clock in &bitfile.used_base_clocks {
        writer.write_empty_with_attributes("BaseClock", &[("name", clock.name.as_str())])?;
    }
    writer.write_end("UsedBaseClockList")?;
    writer.write_text_element("version", "1")?;
    writer.write_end("NiFpga")?;
    writer.write_end("CompilationResults")?;
    writer.write_end("CompilationResultsTree")?;
    writer.write_text_element("MultipleUserClocks", bool_text(bitfile.multiple_user_clocks))?;
    writer.write_end("Project")?;

    writer.write_empty("ClientData")?;
    writer.write_text_element("Bitstream", &STANDARD.encode(&bitfile.bitstream))?;
    writer.write_end("Bitfile")?;

    Ok(String::from_utf8(out)?)
}

fn write_register<T: Write>(
    writer: &mut XmlStreamWriter<T>,
    register: &Register,
) -> Result<(), XmlWriteError> {
    writer.write_start("Register")?;
    writer.write_text_element("Name", &register.name)?;
    writer.write_text_element("Hidden", bool_text(register.hidden))?;
    writer.write_text_element("Indicator", bool_text(register.indicator))?;
    writer.write_start("DataType")?;
    match &register.datatype {
        RegisterDataType::Scalar(scalar) => {
            writer.write_start(scalar.code.tag())?;
            writer.write_text_element("Name", &scalar.name)?;
            writer.write_end(scalar.code.tag())?;
        }
        RegisterDataType::Array(array) => {
            writer.write_text_element("Name", &array.name)?;
            writer.write_text_element("Size", &array.size.to_string())?;
            writer.write_start("Type")?;
            writer.write_start(array.element.code.tag())?;
            writer.write_text_element("Name", &array.element.name)?;
            writer.write_end(array.element.code.tag())?;
            writer.write_end("Type")?;
        }
    }
    writer.write_end("DataType")?;
    writer.write_text_element("FlattenedType", &register.flattened_type)?;
    writer.write_empty("Grouping")?;
    writer.write_text_element("Offset", &register.offset.to_string())?;
    writer.write_text_element("SizeInBits", &register.size_in_bits.to_string())?;
    writer.write_text_element("Class", &register.class_id.to_string())?;
    writer.write_text_element("Internal", bool_text(register.internal))?;
    writer.write_empty("TypedefPath")?;
    writer.write_text_element("ID", &register.id.to_string())?;
    writer.write_text_element("Bidirectional", bool_text(register.bidirectional))?;
    writer.write_text_element("Synchronous", bool_text(register.synchronous))?;
    writer.write_text_element("MechanicalAction", register.mechanical_action.tag())?;
    writer.write_text_element("AccessMayTimeout", bool_text(register.access_may_timeout))?;
    writer.write_text_element("RegisterNode", bool_text(register.register_node))?;
    writer.write_empty("SubControlList")?;
    writer.write_end("Register")?;
    Ok(())
}

fn write_channel<T: Write>(
    writer: &mut XmlStreamWriter<T>,
    channel: &DmaChannel,
) -> Result<(), XmlWriteError> {
    writer.write_start_with_attributes("Channel", &[("name", channel.name.as_str())])?;
    writer.write_text_element("BaseAddressTag", &channel.base_address_tag)?;
    writer.write_text_element("ControlSet", &channel.control_set.to_string())?;
    writer.write_start("DataType")?;
    writer.write_text_element("Delta", &channel.datatype.delta.to_string())?;
    writer.write_text_element(
        "IntegerWordLength",
        &channel.datatype.integer_word_length.to_string(),
    )?;
    writer.write_text_element("Maximum", &channel.datatype.maximum.to_string())?;
    writer.write_text_element("Minimum", &channel.datatype.minimum.to_string())?;
    writer.write_text_element("Signed", bool_text(channel.datatype.signed))?;
    writer.write_text_element("SubType", channel.datatype.subtype.tag())?;
    writer.write_text_element("WordLength", &channel.datatype.word_length.to_string())?;
    writer.write_end("DataType")?;
    writer.write_text_element("Implementation", channel.implementation.tag())?;
    writer.write_text_element("Number", &channel.number.to_string())?;
    writer.write_text_element("NumberOfElements", &channel.number_of_elements.to_string())?;
    writer.write_text_element("UserVisible", bool_text(channel.user_visible))?;
    // Direction and the write window pair are decode-only; the generated
    // document never carries them.
    writer.write_end("Channel")?;
    Ok(())
}

fn write_register_block<T: Write>(
    writer: &mut XmlStreamWriter<T>,
    block: &RegisterBlock,
) -> Result<(), XmlWriteError> {
    writer.write_start_with_attributes("RegisterBlock", &[("name", block.name.as_str())])?;
    writer.write_text_element("Offset", &format!("{:#x}", block.offset))?;
    writer.write_end("RegisterBlock")?;
    Ok(())
}

fn write_icon<T: Write>(writer: &mut XmlStreamWriter<T>, icon: &Icon) -> Result<(), XmlWriteError> {
    writer.write_start("Icon")?;
    writer.write_text_element("ImageType", &icon.image_type.to_string())?;
    writer.write_text_element("ImageDepth", &icon.image_depth.to_string())?;
    writer.write_text_element("Image", &icon.image)?;
    writer.write_text_element("Mask", &icon.mask)?;
    writer.write_text_element("Colors", &icon.colors)?;
    writer.write_start("Rectangle")?;
    writer.write_text_element("Left", &icon.rectangle.left.to_string())?;
    writer.write_text_element("Top", &icon.rectangle.top.to_string())?;
    writer.write_text_element("Right", &icon.rectangle.right.to_string())?;
    writer.write_text_element("Bottom", &icon.rectangle.bottom.to_string())?;
    writer.write_end("Rectangle")?;
    writer.write_end("Icon")?;
    Ok(())
}

fn bool_text(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}
