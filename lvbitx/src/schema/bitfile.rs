//! Descriptor records for the LVBITX container and their decoding from a
//! parsed document.
//!
//! Traversal is by tag name, not position, so the decoder accepts any
//! element ordering on input. The generated document in [`crate::generate`]
//! follows the fixed ordering the driver-side schema expects.

use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine};
use roxmltree::{Document, Node};

use crate::{
    error::{LoadError, XmlError},
    ext::{children_with_name, descendant_with_name, find_descendant, value_from_contents, NodeExt},
    XmlLoad,
};

/// Primitive type tag used by register datatypes and DMA channel subtypes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCode {
    /// Boolean value.
    Bool = 0,
    /// Signed 8-bit integer.
    I8 = 1,
    /// Unsigned 8-bit integer.
    U8 = 2,
    /// Signed 16-bit integer.
    I16 = 3,
    /// Unsigned 16-bit integer.
    U16 = 4,
    /// Signed 32-bit integer.
    I32 = 5,
    /// Unsigned 32-bit integer.
    U32 = 6,
    /// Signed 64-bit integer.
    I64 = 7,
    /// Unsigned 64-bit integer.
    U64 = 8,
    /// Array of one of the scalar types.
    Array = 9,
}

impl TypeCode {
    /// All type codes, ordered by their numeric code.
    pub const ALL: [TypeCode; 10] = [
        TypeCode::Bool,
        TypeCode::I8,
        TypeCode::U8,
        TypeCode::I16,
        TypeCode::U16,
        TypeCode::I32,
        TypeCode::U32,
        TypeCode::I64,
        TypeCode::U64,
        TypeCode::Array,
    ];

    /// The schema tag text for this code.
    pub fn tag(&self) -> &'static str {
        match self {
            TypeCode::Bool => "Bool",
            TypeCode::I8 => "I8",
            TypeCode::U8 => "U8",
            TypeCode::I16 => "I16",
            TypeCode::U16 => "U16",
            TypeCode::I32 => "I32",
            TypeCode::U32 => "U32",
            TypeCode::I64 => "I64",
            TypeCode::U64 => "U64",
            TypeCode::Array => "Array",
        }
    }

    /// The numeric code the original toolchain stores for this tag.
    pub fn code(&self) -> u8 {
        *self as u8
    }

    /// Look up a numeric code.
    pub fn try_from_code(code: u8) -> Result<Self, XmlError> {
        Self::ALL
            .get(code as usize)
            .copied()
            .ok_or_else(|| XmlError::unknown_enum_code("TypeCode", code))
    }

    fn from_node(node: &Node<'_, '_>, text: &str) -> Result<Self, XmlError> {
        Ok(match text {
            "Bool" => TypeCode::Bool,
            "I8" => TypeCode::I8,
            "U8" => TypeCode::U8,
            "I16" => TypeCode::I16,
            "U16" => TypeCode::U16,
            "I32" => TypeCode::I32,
            "U32" => TypeCode::U32,
            "I64" => TypeCode::I64,
            "U64" => TypeCode::U64,
            "Array" => TypeCode::Array,
            r => return Err(XmlError::unknown_enum(node, "TypeCode", r)),
        })
    }
}

/// Direction of a DMA channel, seen from the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DmaDirection {
    /// FPGA target to host.
    TargetToHost = 0,
    /// Host to FPGA target.
    HostToTarget = 1,
}

impl DmaDirection {
    /// All directions, ordered by their numeric code.
    pub const ALL: [DmaDirection; 2] = [DmaDirection::TargetToHost, DmaDirection::HostToTarget];

    /// The schema tag text for this direction.
    pub fn tag(&self) -> &'static str {
        match self {
            DmaDirection::TargetToHost => "TargetToHost",
            DmaDirection::HostToTarget => "HostToTarget",
        }
    }

    /// The numeric code for this direction.
    pub fn code(&self) -> u8 {
        *self as u8
    }

    /// Look up a numeric code.
    pub fn try_from_code(code: u8) -> Result<Self, XmlError> {
        Self::ALL
            .get(code as usize)
            .copied()
            .ok_or_else(|| XmlError::unknown_enum_code("DirectionCode", code))
    }

    fn from_node(node: &Node<'_, '_>, text: &str) -> Result<Self, XmlError> {
        Ok(match text {
            "TargetToHost" => DmaDirection::TargetToHost,
            "HostToTarget" => DmaDirection::HostToTarget,
            r => return Err(XmlError::unknown_enum(node, "DirectionCode", r)),
        })
    }
}

/// Mechanical action of a front-panel control backed by a register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MechanicalAction {
    /// Switch when pressed.
    SwitchWhenPressed = 0,
    /// Switch when released.
    SwitchWhenReleased = 1,
    /// Switch until released.
    SwitchUntilReleased = 2,
    /// Latch when pressed.
    LatchWhenPressed = 3,
    /// Latch when released.
    LatchWhenReleased = 4,
    /// Latch until released.
    LatchUntilReleased = 5,
}

impl MechanicalAction {
    /// All mechanical actions, ordered by their numeric code.
    pub const ALL: [MechanicalAction; 6] = [
        MechanicalAction::SwitchWhenPressed,
        MechanicalAction::SwitchWhenReleased,
        MechanicalAction::SwitchUntilReleased,
        MechanicalAction::LatchWhenPressed,
        MechanicalAction::LatchWhenReleased,
        MechanicalAction::LatchUntilReleased,
    ];

    /// The schema tag text for this action.
    pub fn tag(&self) -> &'static str {
        match self {
            MechanicalAction::SwitchWhenPressed => "Switch When Pressed",
            MechanicalAction::SwitchWhenReleased => "Switch When Released",
            MechanicalAction::SwitchUntilReleased => "Switch Until Released",
            MechanicalAction::LatchWhenPressed => "Latch When Pressed",
            MechanicalAction::LatchWhenReleased => "Latch When Released",
            MechanicalAction::LatchUntilReleased => "Latch Until Released",
        }
    }

    /// The numeric code for this action.
    pub fn code(&self) -> u8 {
        *self as u8
    }

    /// Look up a numeric code.
    pub fn try_from_code(code: u8) -> Result<Self, XmlError> {
        Self::ALL
            .get(code as usize)
            .copied()
            .ok_or_else(|| XmlError::unknown_enum_code("MechanicalActionCode", code))
    }

    fn from_node(node: &Node<'_, '_>, text: &str) -> Result<Self, XmlError> {
        Ok(match text {
            "Switch When Pressed" => MechanicalAction::SwitchWhenPressed,
            "Switch When Released" => MechanicalAction::SwitchWhenReleased,
            "Switch Until Released" => MechanicalAction::SwitchUntilReleased,
            "Latch When Pressed" => MechanicalAction::LatchWhenPressed,
            "Latch When Released" => MechanicalAction::LatchWhenReleased,
            "Latch Until Released" => MechanicalAction::LatchUntilReleased,
            r => return Err(XmlError::unknown_enum(node, "MechanicalActionCode", r)),
        })
    }
}

/// How a DMA channel is realized on the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DmaImplementation {
    /// Peer-to-peer FIFO reader.
    PeerToPeerReader = 0,
    /// Peer-to-peer FIFO writer.
    PeerToPeerWriter = 1,
    /// Target-to-host stream.
    TargetToHost = 2,
    /// Host-to-target stream.
    HostToTarget = 3,
}

impl DmaImplementation {
    /// All implementations, ordered by their numeric code.
    pub const ALL: [DmaImplementation; 4] = [
        DmaImplementation::PeerToPeerReader,
        DmaImplementation::PeerToPeerWriter,
        DmaImplementation::TargetToHost,
        DmaImplementation::HostToTarget,
    ];

    /// The schema tag text for this implementation.
    pub fn tag(&self) -> &'static str {
        match self {
            DmaImplementation::PeerToPeerReader => "niFpgaPeerToPeerReader",
            DmaImplementation::PeerToPeerWriter => "niFpgaPeerToPeerWriter",
            DmaImplementation::TargetToHost => "niFpgaTargetToHost",
            DmaImplementation::HostToTarget => "niFpgaHostToTarget",
        }
    }

    /// The numeric code for this implementation.
    pub fn code(&self) -> u8 {
        *self as u8
    }

    /// Look up a numeric code.
    pub fn try_from_code(code: u8) -> Result<Self, XmlError> {
        Self::ALL
            .get(code as usize)
            .copied()
            .ok_or_else(|| XmlError::unknown_enum_code("ImplementationCode", code))
    }

    fn from_node(node: &Node<'_, '_>, text: &str) -> Result<Self, XmlError> {
        Ok(match text {
            "niFpgaPeerToPeerReader" => DmaImplementation::PeerToPeerReader,
            "niFpgaPeerToPeerWriter" => DmaImplementation::PeerToPeerWriter,
            "niFpgaTargetToHost" => DmaImplementation::TargetToHost,
            "niFpgaHostToTarget" => DmaImplementation::HostToTarget,
            r => return Err(XmlError::unknown_enum(node, "ImplementationCode", r)),
        })
    }
}

/// Scalar register datatype.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarType {
    /// Primitive type tag.
    pub code: TypeCode,
    /// Type name.
    pub name: String,
}

impl Default for ScalarType {
    fn default() -> Self {
        Self {
            code: TypeCode::Bool,
            name: String::new(),
        }
    }
}

impl<'input> XmlLoad<'input> for ScalarType {
    fn load(node: &Node<'_, 'input>) -> Result<Self, XmlError> {
        // The element tag itself carries the type code.
        let code = TypeCode::from_node(node, node.tag_name().name())?;
        let name = node
            .first_child_with_name("Name")?
            .text()
            .unwrap_or_default()
            .to_owned();
        Ok(Self { code, name })
    }
}

/// Array register datatype: a counted sequence of one scalar subtype.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayType {
    /// Array name.
    pub name: String,
    /// Number of elements.
    pub size: u32,
    /// Element subtype. Arrays of arrays are not representable.
    pub element: ScalarType,
}

impl Default for ArrayType {
    fn default() -> Self {
        Self {
            name: String::new(),
            size: 4,
            element: ScalarType::default(),
        }
    }
}

impl<'input> XmlLoad<'input> for ArrayType {
    fn load(node: &Node<'_, 'input>) -> Result<Self, XmlError> {
        let name = node
            .first_child_with_name("Name")?
            .text()
            .unwrap_or_default()
            .to_owned();
        let size = value_from_contents(&node.first_child_with_name("Size")?)?;
        let type_node = node.first_child_with_name("Type")?;
        let element_node = type_node
            .first_element_child()
            .ok_or_else(|| XmlError::missing_content(&type_node))?;
        let element = ScalarType::load(&element_node)?;
        if element.code == TypeCode::Array {
            return Err(XmlError::other(node, "arrays of arrays are not supported"));
        }
        Ok(Self {
            name,
            size,
            element,
        })
    }
}

/// Datatype of a register: scalar or array of scalars.
#[derive(Debug, Clone, PartialEq)]
pub enum RegisterDataType {
    /// A single scalar value.
    Scalar(ScalarType),
    /// An array of scalar values.
    Array(ArrayType),
}

impl Default for RegisterDataType {
    fn default() -> Self {
        RegisterDataType::Scalar(ScalarType::default())
    }
}

impl<'input> XmlLoad<'input> for RegisterDataType {
    fn load(node: &Node<'_, 'input>) -> Result<Self, XmlError> {
        if let Some(array) = node.with_name("Array").next() {
            Ok(RegisterDataType::Array(ArrayType::load(&array)?))
        } else {
            let element = node
                .first_element_child()
                .ok_or_else(|| XmlError::missing_content(node))?;
            Ok(RegisterDataType::Scalar(ScalarType::load(&element)?))
        }
    }
}

/// An addressable FPGA interface value with a fixed offset and bit width.
#[derive(Debug, Clone, PartialEq)]
pub struct Register {
    /// Register name.
    pub name: String,
    /// Hidden from the interface.
    pub hidden: bool,
    /// Appears as an indicator rather than a control.
    pub indicator: bool,
    /// Register datatype.
    pub datatype: RegisterDataType,
    /// Flattened LabVIEW type descriptor, carried verbatim.
    pub flattened_type: String,
    /// Address offset for read/write access.
    pub offset: u32,
    /// Register width in bits.
    pub size_in_bits: u32,
    /// Numeric class id of the datatype.
    pub class_id: u32,
    /// Internal variable not meant for user access.
    pub internal: bool,
    /// Numeric register id.
    pub id: u32,
    /// Readable and writable.
    pub bidirectional: bool,
    /// Synchronous access.
    pub synchronous: bool,
    /// Mechanical action of the backing control.
    pub mechanical_action: MechanicalAction,
    /// Accesses may time out.
    pub access_may_timeout: bool,
    /// Register node flag.
    pub register_node: bool,
}

impl Default for Register {
    fn default() -> Self {
        Self {
            name: String::new(),
            hidden: false,
            indicator: false,
            datatype: RegisterDataType::default(),
            flattened_type: String::new(),
            offset: 0,
            size_in_bits: 0,
            class_id: 18,
            internal: false,
            id: 0,
            bidirectional: true,
            synchronous: false,
            mechanical_action: MechanicalAction::SwitchWhenPressed,
            access_may_timeout: false,
            register_node: false,
        }
    }
}

impl<'input> XmlLoad<'input> for Register {
    fn load(node: &Node<'_, 'input>) -> Result<Self, XmlError> {
        let mut register = Register::default();
        for child in node.children() {
            match child.tag_name().name() {
                "Name" => register.name = value_from_contents(&child)?,
                "Hidden" => register.hidden = value_from_contents(&child)?,
                "Indicator" => register.indicator = value_from_contents(&child)?,
                // Generated documents carry "DataType"; files produced by
                // some toolchain versions spell it "Datatype".
                "DataType" | "Datatype" => {
                    register.datatype = RegisterDataType::load(&child)?;
                }
                "FlattenedType" => register.flattened_type = value_from_contents(&child)?,
                "Offset" => register.offset = value_from_contents(&child)?,
                "SizeInBits" => register.size_in_bits = value_from_contents(&child)?,
                "Class" => register.class_id = value_from_contents(&child)?,
                "Internal" => register.internal = value_from_contents(&child)?,
                "ID" => register.id = value_from_contents(&child)?,
                "Bidirectional" => register.bidirectional = value_from_contents(&child)?,
                "Synchronous" => register.synchronous = value_from_contents(&child)?,
                "MechanicalAction" => {
                    register.mechanical_action =
                        MechanicalAction::from_node(&child, child.text().unwrap_or_default())?;
                }
                "AccessMayTimeout" => register.access_may_timeout = value_from_contents(&child)?,
                "RegisterNode" => register.register_node = value_from_contents(&child)?,
                _ => {}
            }
        }
        Ok(register)
    }
}

/// A named address-offset grouping for a cluster of registers.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RegisterBlock {
    /// Block name.
    pub name: String,
    /// Address offset. Hexadecimal text on the wire.
    pub offset: u32,
}

impl<'input> XmlLoad<'input> for RegisterBlock {
    fn load(node: &Node<'_, 'input>) -> Result<Self, XmlError> {
        let mut block = RegisterBlock {
            name: node.try_attribute("name")?.to_owned(),
            offset: 0,
        };
        for child in node.children() {
            if child.has_tag_name("Offset") {
                block.offset = hex_from_contents(&child)?;
            }
        }
        Ok(block)
    }
}

fn hex_from_contents(node: &Node<'_, '_>) -> Result<u32, XmlError> {
    let text = node.text().unwrap_or_default().trim();
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    u32::from_str_radix(digits, 16).map_err(|e| XmlError::parse_int(node, "content", e))
}

/// Element datatype of a DMA channel.
#[derive(Debug, Clone, PartialEq)]
pub struct DmaDataType {
    /// Increment delta.
    pub delta: f64,
    /// Integer word length in bits.
    pub integer_word_length: u32,
    /// Maximum representable value.
    pub maximum: f64,
    /// Minimum representable value.
    pub minimum: f64,
    /// Signed datatype.
    pub signed: bool,
    /// Element subtype.
    pub subtype: TypeCode,
    /// Word length in bits.
    pub word_length: u32,
}

impl Default for DmaDataType {
    fn default() -> Self {
        Self {
            delta: 1.0,
            integer_word_length: 32,
            maximum: 1.0,
            minimum: 0.0,
            signed: false,
            subtype: TypeCode::Bool,
            word_length: 0,
        }
    }
}

impl<'input> XmlLoad<'input> for DmaDataType {
    fn load(node: &Node<'_, 'input>) -> Result<Self, XmlError> {
        let mut datatype = DmaDataType::default();
        for child in node.children() {
            match child.tag_name().name() {
                "Delta" => datatype.delta = value_from_contents(&child)?,
                "IntegerWordLength" => datatype.integer_word_length = value_from_contents(&child)?,
                "Maximum" => datatype.maximum = value_from_contents(&child)?,
                "Minimum" => datatype.minimum = value_from_contents(&child)?,
                "Signed" => datatype.signed = value_from_contents(&child)?,
                "SubType" => {
                    datatype.subtype =
                        TypeCode::from_node(&child, child.text().unwrap_or_default().trim())?;
                }
                "WordLength" => datatype.word_length = value_from_contents(&child)?,
                _ => {}
            }
        }
        Ok(datatype)
    }
}

/// A streaming data channel between host and FPGA target.
#[derive(Debug, Clone, PartialEq)]
pub struct DmaChannel {
    /// Channel name. Carried as an attribute, not a child element.
    pub name: String,
    /// Base address tag.
    pub base_address_tag: String,
    /// Control set id.
    pub control_set: u32,
    /// Element datatype.
    pub datatype: DmaDataType,
    /// Channel direction. Read on decode; the generator never emits it.
    pub direction: DmaDirection,
    /// Channel implementation.
    pub implementation: DmaImplementation,
    /// Numeric channel id used to open the channel.
    pub number: u32,
    /// Number of elements the channel can host.
    pub number_of_elements: u32,
    /// Visible to the user.
    pub user_visible: bool,
    /// Address tag of a peer-to-peer write window. Read on decode; the
    /// generator never emits it.
    pub write_window_address_tag: String,
    /// Element count of a peer-to-peer write window. Read on decode; the
    /// generator never emits it.
    pub write_window_size: u32,
}

impl Default for DmaChannel {
    fn default() -> Self {
        Self {
            name: String::new(),
            base_address_tag: String::new(),
            control_set: 0,
            datatype: DmaDataType::default(),
            direction: DmaDirection::TargetToHost,
            implementation: DmaImplementation::PeerToPeerReader,
            number: 0,
            number_of_elements: 0,
            user_visible: true,
            write_window_address_tag: String::new(),
            write_window_size: 0,
        }
    }
}

impl<'input> XmlLoad<'input> for DmaChannel {
    fn load(node: &Node<'_, 'input>) -> Result<Self, XmlError> {
        let mut channel = DmaChannel {
            name: node.try_attribute("name")?.to_owned(),
            ..Default::default()
        };
        for child in node.children() {
            match child.tag_name().name() {
                "BaseAddressTag" => channel.base_address_tag = value_from_contents(&child)?,
                "ControlSet" => channel.control_set = value_from_contents(&child)?,
                "DataType" => channel.datatype = DmaDataType::load(&child)?,
                "Direction" => {
                    channel.direction =
                        DmaDirection::from_node(&child, child.text().unwrap_or_default().trim())?;
                }
                "Implementation" => {
                    channel.implementation = DmaImplementation::from_node(
                        &child,
                        child.text().unwrap_or_default().trim(),
                    )?;
                }
                "Number" => channel.number = value_from_contents(&child)?,
                "NumberOfElements" => channel.number_of_elements = value_from_contents(&child)?,
                "UserVisible" => channel.user_visible = value_from_contents(&child)?,
                "WriteWindowAddressTag" => {
                    channel.write_window_address_tag = value_from_contents(&child)?;
                }
                "WriteWindowSize" => channel.write_window_size = value_from_contents(&child)?,
                _ => {}
            }
        }
        Ok(channel)
    }
}

/// A named clock domain used by the compiled design.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BaseClock {
    /// Clock name. Carried as an attribute.
    pub name: String,
}

impl<'input> XmlLoad<'input> for BaseClock {
    fn load(node: &Node<'_, 'input>) -> Result<Self, XmlError> {
        Ok(Self {
            name: node.try_attribute("name")?.to_owned(),
        })
    }
}

/// Bounding rectangle of the VI icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IconRect {
    /// Left edge.
    pub left: i32,
    /// Top edge.
    pub top: i32,
    /// Right edge.
    pub right: i32,
    /// Bottom edge.
    pub bottom: i32,
}

impl<'input> XmlLoad<'input> for IconRect {
    fn load(node: &Node<'_, 'input>) -> Result<Self, XmlError> {
        let mut rect = IconRect::default();
        for child in node.children() {
            match child.tag_name().name() {
                "Left" => rect.left = value_from_contents(&child)?,
                "Top" => rect.top = value_from_contents(&child)?,
                "Right" => rect.right = value_from_contents(&child)?,
                "Bottom" => rect.bottom = value_from_contents(&child)?,
                _ => {}
            }
        }
        Ok(rect)
    }
}

/// The VI icon. All image fields are opaque base64 strings; this crate
/// never decodes them.
#[derive(Debug, Clone, PartialEq)]
pub struct Icon {
    /// Image type.
    pub image_type: u32,
    /// Image depth in bits.
    pub image_depth: u32,
    /// Base64 image data.
    pub image: String,
    /// Base64 transparency mask.
    pub mask: String,
    /// Base64 color table.
    pub colors: String,
    /// Icon bounding rectangle.
    pub rectangle: IconRect,
}

impl Default for Icon {
    fn default() -> Self {
        Self {
            image_type: 0,
            image_depth: 8,
            image: String::new(),
            mask: String::new(),
            colors: String::new(),
            rectangle: IconRect::default(),
        }
    }
}

impl<'input> XmlLoad<'input> for Icon {
    fn load(node: &Node<'_, 'input>) -> Result<Self, XmlError> {
        let mut icon = Icon::default();
        for child in node.children() {
            match child.tag_name().name() {
                "ImageType" => icon.image_type = value_from_contents(&child)?,
                "ImageDepth" => icon.image_depth = value_from_contents(&child)?,
                "Image" => icon.image = value_from_contents(&child)?,
                "Mask" => icon.mask = value_from_contents(&child)?,
                "Colors" => icon.colors = value_from_contents(&child)?,
                "Rectangle" => icon.rectangle = IconRect::load(&child)?,
                _ => {}
            }
        }
        Ok(icon)
    }
}

/// A fully decoded LVBITX document.
#[derive(Debug, Clone, PartialEq)]
pub struct Bitfile {
    /// Signature to be provided to the driver on load.
    pub signature_register: String,
    /// Signature GUID list, carried verbatim.
    pub signature_guids: String,
    /// Signature name list, carried verbatim.
    pub signature_names: String,
    /// Name of the VI the design was compiled from.
    pub vi_name: String,
    /// Target hardware class.
    pub target_class: String,
    /// Run the design as soon as it is downloaded.
    pub auto_run_when_downloaded: bool,
    /// More than one user clock is defined.
    pub multiple_user_clocks: bool,
    /// Decoded bitstream payload. Opaque bytes.
    pub bitstream: Vec<u8>,
    /// Register map, in document order.
    pub registers: Vec<Register>,
    /// VI icon.
    pub icon: Icon,
    /// DMA channel allocations, in document order.
    pub channels: Vec<DmaChannel>,
    /// Register blocks, in document order.
    pub register_blocks: Vec<RegisterBlock>,
    /// Base clocks used by the design, in document order.
    pub used_base_clocks: Vec<BaseClock>,
}

impl Default for Bitfile {
    fn default() -> Self {
        Self {
            signature_register: String::new(),
            signature_guids: String::new(),
            signature_names: String::new(),
            vi_name: "default.vi".to_owned(),
            target_class: "PXIe-7965R".to_owned(),
            auto_run_when_downloaded: false,
            multiple_user_clocks: false,
            bitstream: Vec::new(),
            registers: Vec::new(),
            icon: Icon::default(),
            channels: Vec::new(),
            register_blocks: Vec::new(),
            used_base_clocks: Vec::new(),
        }
    }
}

impl Bitfile {
    /// Decode a parsed document into descriptors.
    ///
    /// Scalar fields missing from the document keep their defaults. The
    /// four list-bearing sections are required; a document without them
    /// is rejected.
    pub fn from_document(doc: &Document) -> Result<Self, XmlError> {
        let mut bitfile = Bitfile {
            signature_register: read_signature(doc),
            signature_guids: element_text(doc, "SignatureGuids"),
            signature_names: element_text(doc, "SignatureNames"),
            vi_name: read_vi_name(doc),
            bitstream: read_bitstream(doc),
            registers: read_registers(doc)?,
            channels: read_dma_channels(doc)?,
            register_blocks: read_register_blocks(doc)?,
            used_base_clocks: read_used_base_clocks(doc)?,
            ..Default::default()
        };
        if let Some(node) = find_descendant(doc, "TargetClass") {
            bitfile.target_class = node.text().unwrap_or_default().to_owned();
        }
        if let Some(node) = find_descendant(doc, "AutoRunWhenDownloaded") {
            bitfile.auto_run_when_downloaded = node.text() == Some("true");
        }
        if let Some(node) = find_descendant(doc, "MultipleUserClocks") {
            bitfile.multiple_user_clocks = node.text() == Some("true");
        }
        if let Some(node) = find_descendant(doc, "Icon") {
            bitfile.icon = Icon::load(&node)?;
        }
        Ok(bitfile)
    }
}

/// Read the signature of the unique `SignatureRegister` element.
///
/// Best-effort: a document without one yields an empty string.
pub fn read_signature(doc: &Document) -> String {
    element_text(doc, "SignatureRegister")
}

/// Read the VI name: the `Name` child of the first `VI` element.
///
/// Best-effort: a document without one yields an empty string.
pub fn read_vi_name(doc: &Document) -> String {
    find_descendant(doc, "VI")
        .and_then(|vi| vi.children().find(|n| n.has_tag_name("Name")))
        .and_then(|name| name.text())
        .unwrap_or_default()
        .to_owned()
}

/// Decode the bitstream payload of the unique `Bitstream` element.
///
/// Best-effort: a document without one, or with undecodable contents,
/// yields empty bytes.
pub fn read_bitstream(doc: &Document) -> Vec<u8> {
    let Some(text) = find_descendant(doc, "Bitstream").and_then(|n| n.text()) else {
        return Vec::new();
    };
    // Serializers are free to wrap the payload.
    let compact: String = text.split_ascii_whitespace().collect();
    STANDARD.decode(compact).unwrap_or_default()
}

/// Read the register map from the required `RegisterList` section.
pub fn read_registers(doc: &Document) -> Result<Vec<Register>, XmlError> {
    let list = descendant_with_name(doc, "RegisterList")?;
    children_with_name(&list, "Register")
}

/// Read the DMA channels from the required `DmaChannelAllocationList` section.
pub fn read_dma_channels(doc: &Document) -> Result<Vec<DmaChannel>, XmlError> {
    let list = descendant_with_name(doc, "DmaChannelAllocationList")?;
    children_with_name(&list, "Channel")
}

/// Read the register blocks from the required `RegisterBlockList` section.
pub fn read_register_blocks(doc: &Document) -> Result<Vec<RegisterBlock>, XmlError> {
    let list = descendant_with_name(doc, "RegisterBlockList")?;
    children_with_name(&list, "RegisterBlock")
}

/// Read the base clocks from the required `UsedBaseClockList` section.
pub fn read_used_base_clocks(doc: &Document) -> Result<Vec<BaseClock>, XmlError> {
    let list = descendant_with_name(doc, "UsedBaseClockList")?;
    children_with_name(&list, "BaseClock")
}

fn element_text(doc: &Document, name: &str) -> String {
    find_descendant(doc, name)
        .and_then(|n| n.text())
        .unwrap_or_default()
        .to_owned()
}

/// Parse an LVBITX document from a string and decode it into descriptors.
pub fn load_bitfile(document: &str) -> Result<Bitfile, XmlError> {
    let doc = Document::parse(document)?;
    Bitfile::from_document(&doc)
}

/// Read an LVBITX file from disk and decode it into descriptors.
pub fn load_bitfile_file(path: impl AsRef<Path>) -> Result<Bitfile, LoadError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .map_err(|e| LoadError::Io(path.display().to_string(), e))?;
    Ok(load_bitfile(&text)?)
}

#[cfg(test)]
mod tests {
    use roxmltree::Document;

    use crate::error::XmlErrorInner;

    use super::*;

    const TEST_BITFILE: &str = r#"<?xml version="1.0"?>
<Bitfile>
  <BitfileVersion>1.0</BitfileVersion>
  <SignatureRegister>1A2B3C4D</SignatureRegister>
  <SignatureGuids>guid-a;guid-b</SignatureGuids>
  <SignatureNames>Control;Samples</SignatureNames>
  <VI>
    <Name>controller.vi</Name>
    <RegisterList>
      <Register>
        <Name>Control</Name>
        <Hidden>false</Hidden>
        <Indicator>false</Indicator>
        <DataType><I32><Name>Control</Name></I32></DataType>
        <FlattenedType>flat</FlattenedType>
        <Grouping/>
        <Offset>16</Offset>
        <SizeInBits>32</SizeInBits>
        <Class>18</Class>
        <Internal>false</Internal>
        <TypedefPath/>
        <ID>1</ID>
        <Bidirectional>true</Bidirectional>
        <Synchronous>false</Synchronous>
        <MechanicalAction>Switch When Pressed</MechanicalAction>
        <AccessMayTimeout>false</AccessMayTimeout>
        <RegisterNode>false</RegisterNode>
        <SubControlList/>
      </Register>
      <Register>
        <Name>Samples</Name>
        <Indicator>true</Indicator>
        <DataType>
          <Array>
            <Name>Samples</Name>
            <Size>8</Size>
            <Type><U16><Name>Sample</Name></U16></Type>
          </Array>
        </DataType>
        <Offset>32</Offset>
        <SizeInBits>128</SizeInBits>
        <ID>2</ID>
        <MechanicalAction>Latch When Released</MechanicalAction>
      </Register>
    </RegisterList>
  </VI>
  <Icon>
    <ImageType>0</ImageType>
    <ImageDepth>8</ImageDepth>
    <Image>aWNvbg==</Image>
    <Mask>bWFzaw==</Mask>
    <Colors>Y29sb3Jz</Colors>
    <Rectangle>
      <Left>0</Left>
      <Top>0</Top>
      <Right>32</Right>
      <Bottom>32</Bottom>
    </Rectangle>
  </Icon>
  <Project>
    <TargetClass>PXIe-7965R</TargetClass>
    <AutoRunWhenDownloaded>false</AutoRunWhenDownloaded>
    <CompilationResultsTree>
      <CompilationResults>
        <NiFpga>
          <DmaChannelAllocationList>
            <Channel name="FIFO0">
              <BaseAddressTag>tag0</BaseAddressTag>
              <ControlSet>3</ControlSet>
              <DataType>
                <Delta>1</Delta>
                <IntegerWordLength>16</IntegerWordLength>
                <Maximum>65535</Maximum>
                <Minimum>0</Minimum>
                <Signed>false</Signed>
                <SubType>U16</SubType>
                <WordLength>16</WordLength>
              </DataType>
              <Direction>TargetToHost</Direction>
              <Implementation>niFpgaTargetToHost</Implementation>
              <Number>0</Number>
              <NumberOfElements>1023</NumberOfElements>
              <UserVisible>true</UserVisible>
              <WriteWindowAddressTag>p2p</WriteWindowAddressTag>
              <WriteWindowSize>64</WriteWindowSize>
            </Channel>
          </DmaChannelAllocationList>
          <RegisterBlockList>
            <RegisterBlock name="Block0">
              <Offset>0x1000</Offset>
            </RegisterBlock>
          </RegisterBlockList>
          <UsedBaseClockList>
            <BaseClock name="40 MHz Onboard Clock"/>
          </UsedBaseClockList>
          <version>1</version>
        </NiFpga>
      </CompilationResults>
    </CompilationResultsTree>
    <MultipleUserClocks>false</MultipleUserClocks>
  </Project>
  <ClientData/>
  <Bitstream>AAECAw==</Bitstream>
</Bitfile>"#;

    #[test]
    fn test_read_registers() {
        let doc = Document::parse(TEST_BITFILE).unwrap();
        let registers = read_registers(&doc).unwrap();
        assert_eq!(registers.len(), 2);

        let control = &registers[0];
        assert_eq!(control.name, "Control");
        assert!(!control.hidden);
        assert_eq!(control.offset, 16);
        assert_eq!(control.size_in_bits, 32);
        assert_eq!(control.class_id, 18);
        assert_eq!(control.id, 1);
        assert!(control.bidirectional);
        assert_eq!(control.mechanical_action, MechanicalAction::SwitchWhenPressed);
        assert_eq!(control.mechanical_action.code(), 0);
        let RegisterDataType::Scalar(scalar) = &control.datatype else {
            panic!("Unexpected datatype variant");
        };
        assert_eq!(scalar.code, TypeCode::I32);
        assert_eq!(scalar.name, "Control");
    }

    #[test]
    fn test_read_array_register_and_defaults() {
        let doc = Document::parse(TEST_BITFILE).unwrap();
        let registers = read_registers(&doc).unwrap();

        let samples = &registers[1];
        assert!(samples.indicator);
        // Fields without a matching element keep their defaults.
        assert_eq!(samples.class_id, 18);
        assert!(samples.bidirectional);
        assert!(!samples.hidden);
        let RegisterDataType::Array(array) = &samples.datatype else {
            panic!("Unexpected datatype variant");
        };
        assert_eq!(array.name, "Samples");
        assert_eq!(array.size, 8);
        assert_eq!(array.element.code, TypeCode::U16);
        assert_eq!(array.element.name, "Sample");
    }

    #[test]
    fn test_read_dma_channels() {
        let doc = Document::parse(TEST_BITFILE).unwrap();
        let channels = read_dma_channels(&doc).unwrap();
        assert_eq!(channels.len(), 1);

        let channel = &channels[0];
        assert_eq!(channel.name, "FIFO0");
        assert_eq!(channel.base_address_tag, "tag0");
        assert_eq!(channel.control_set, 3);
        assert_eq!(channel.direction, DmaDirection::TargetToHost);
        assert_eq!(channel.implementation, DmaImplementation::TargetToHost);
        assert_eq!(channel.number_of_elements, 1023);
        assert_eq!(channel.write_window_address_tag, "p2p");
        assert_eq!(channel.write_window_size, 64);
        assert_eq!(channel.datatype.subtype, TypeCode::U16);
        assert_eq!(channel.datatype.integer_word_length, 16);
        assert_eq!(channel.datatype.maximum, 65535.0);
        assert!(!channel.datatype.signed);
    }

    #[test]
    fn test_read_register_blocks() {
        let doc = Document::parse(TEST_BITFILE).unwrap();
        let blocks = read_register_blocks(&doc).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].name, "Block0");
        assert_eq!(blocks[0].offset, 4096);
    }

    #[test]
    fn test_read_used_base_clocks() {
        let doc = Document::parse(TEST_BITFILE).unwrap();
        let clocks = read_used_base_clocks(&doc).unwrap();
        assert_eq!(clocks.len(), 1);
        assert_eq!(clocks[0].name, "40 MHz Onboard Clock");
    }

    #[test]
    fn test_read_scalars_and_bitstream() {
        let doc = Document::parse(TEST_BITFILE).unwrap();
        assert_eq!(read_signature(&doc), "1A2B3C4D");
        assert_eq!(read_vi_name(&doc), "controller.vi");
        assert_eq!(read_bitstream(&doc), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_full_document_decode() {
        let bitfile = load_bitfile(TEST_BITFILE).unwrap();
        assert_eq!(bitfile.signature_register, "1A2B3C4D");
        assert_eq!(bitfile.signature_guids, "guid-a;guid-b");
        assert_eq!(bitfile.target_class, "PXIe-7965R");
        assert!(!bitfile.auto_run_when_downloaded);
        assert!(!bitfile.multiple_user_clocks);
        assert_eq!(bitfile.icon.image, "aWNvbg==");
        assert_eq!(bitfile.icon.rectangle.right, 32);
        assert_eq!(bitfile.registers.len(), 2);
        assert_eq!(bitfile.channels.len(), 1);
    }

    #[test]
    fn test_missing_signature_is_empty() {
        let doc = Document::parse("<Bitfile><VI/></Bitfile>").unwrap();
        assert_eq!(read_signature(&doc), "");
        assert_eq!(read_vi_name(&doc), "");
        assert_eq!(read_bitstream(&doc), Vec::<u8>::new());
    }

    #[test]
    fn test_missing_register_list_is_an_error() {
        let doc = Document::parse("<Bitfile><VI><Name>x.vi</Name></VI></Bitfile>").unwrap();
        let err = read_registers(&doc).unwrap_err();
        assert!(matches!(err.error, XmlErrorInner::MissingField(name) if name == "RegisterList"));
    }

    #[test]
    fn test_boolean_text_is_case_sensitive() {
        let xml = r#"<Bitfile><RegisterList><Register>
            <Name>r</Name>
            <Hidden>TRUE</Hidden>
            <Indicator>true</Indicator>
            <Bidirectional>yes</Bidirectional>
        </Register></RegisterList></Bitfile>"#;
        let doc = Document::parse(xml).unwrap();
        let registers = read_registers(&doc).unwrap();
        assert!(!registers[0].hidden);
        assert!(registers[0].indicator);
        assert!(!registers[0].bidirectional);
    }

    #[test]
    fn test_unknown_mechanical_action_is_an_error() {
        let xml = r#"<Bitfile><RegisterList><Register>
            <Name>r</Name>
            <MechanicalAction>Hold Forever</MechanicalAction>
        </Register></RegisterList></Bitfile>"#;
        let doc = Document::parse(xml).unwrap();
        let err = read_registers(&doc).unwrap_err();
        assert!(matches!(
            err.error,
            XmlErrorInner::UnknownEnumValue("MechanicalActionCode", v) if v == "Hold Forever"
        ));
    }

    #[test]
    fn test_malformed_number_is_an_error() {
        let xml = r#"<Bitfile><RegisterList><Register>
            <Name>r</Name>
            <Offset>sixteen</Offset>
        </Register></RegisterList></Bitfile>"#;
        let doc = Document::parse(xml).unwrap();
        let err = read_registers(&doc).unwrap_err();
        assert!(matches!(err.error, XmlErrorInner::ParseInt(_, _)));
    }

    #[test]
    fn test_nested_array_is_rejected() {
        let xml = r#"<Bitfile><RegisterList><Register>
            <Name>r</Name>
            <DataType>
              <Array>
                <Name>outer</Name>
                <Size>2</Size>
                <Type><Array><Name>inner</Name></Array></Type>
              </Array>
            </DataType>
        </Register></RegisterList></Bitfile>"#;
        let doc = Document::parse(xml).unwrap();
        let err = read_registers(&doc).unwrap_err();
        assert!(matches!(err.error, XmlErrorInner::Other(_)));
    }

    #[test]
    fn test_register_block_offset_without_prefix() {
        let xml = r#"<Bitfile><RegisterBlockList>
            <RegisterBlock name="b"><Offset>1000</Offset></RegisterBlock>
        </RegisterBlockList></Bitfile>"#;
        let doc = Document::parse(xml).unwrap();
        let blocks = read_register_blocks(&doc).unwrap();
        assert_eq!(blocks[0].offset, 4096);
    }

    #[test]
    fn test_type_code_table_is_total() {
        for (i, code) in TypeCode::ALL.iter().enumerate() {
            assert_eq!(code.code(), i as u8);
            assert_eq!(TypeCode::try_from_code(i as u8).unwrap(), *code);
        }
        let err = TypeCode::try_from_code(10).unwrap_err();
        assert!(matches!(
            err.error,
            XmlErrorInner::UnknownEnumValue("TypeCode", _)
        ));
    }

    #[test]
    fn test_enum_tables_align_with_codes() {
        for (i, action) in MechanicalAction::ALL.iter().enumerate() {
            assert_eq!(action.code(), i as u8);
            assert_eq!(MechanicalAction::try_from_code(i as u8).unwrap(), *action);
        }
        for (i, direction) in DmaDirection::ALL.iter().enumerate() {
            assert_eq!(direction.code(), i as u8);
            assert_eq!(DmaDirection::try_from_code(i as u8).unwrap(), *direction);
        }
        for (i, implementation) in DmaImplementation::ALL.iter().enumerate() {
            assert_eq!(implementation.code(), i as u8);
            assert_eq!(
                DmaImplementation::try_from_code(i as u8).unwrap(),
                *implementation
            );
        }
        assert!(MechanicalAction::try_from_code(6).is_err());
        assert!(DmaDirection::try_from_code(2).is_err());
        assert!(DmaImplementation::try_from_code(4).is_err());
    }

    #[test]
    fn test_unparsed_document_is_an_error() {
        let err = load_bitfile("not xml <<").unwrap_err();
        assert!(matches!(err.error, XmlErrorInner::Xml(_)));
    }
}
